pub mod audit;
pub mod crawler;
pub mod error;
pub mod links;
pub mod result;
pub mod session;

pub use audit::{PageAuditor, RawAuditOutput, RawNode, RawViolation, StaticAuditor};
pub use crawler::{CrawlConfig, Crawler, ProgressCallback};
pub use error::ScanError;
pub use result::{FrontierEntry, PageAuditResult};
pub use session::{HttpSessionConfig, HttpSessionProvider, Page, Session, SessionProvider};
