pub mod config;
pub mod data;
pub mod decode;
pub mod error;
pub mod report;
pub mod scan;
pub mod score;
pub mod store;

pub use config::ScanConfig;
pub use data::Database;
pub use decode::{AffectedNode, ImpactLevel, Violation, decode, remediation_hint};
pub use error::{ScanSessionError, StoreError};
pub use scan::{NO_RESULTS_MESSAGE, PageSummary, SCAN_SUCCEEDED_MESSAGE, ScanOutcome, ScanSession};
pub use score::{ImpactCounts, ScoreWeights, score, score_with};
pub use store::{
    PageReport, ReportStats, ResultStore, ScanStatus, ScannedWebsite, User, UserStore,
    normalize_email,
};
