use crate::audit::RawAuditOutput;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A URL waiting in the crawl frontier, with its hop distance from the seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: usize,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>, depth: usize) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// One successfully audited page. Never mutated once the orchestrator
/// hands it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAuditResult {
    pub url: String,
    pub depth: usize,
    pub audit: RawAuditOutput,
    /// Normalized links discovered on this page (empty at the depth limit).
    pub links_found: Vec<String>,
    pub elapsed: Duration,
}

impl PageAuditResult {
    pub fn new(url: String, depth: usize, audit: RawAuditOutput) -> Self {
        Self {
            url,
            depth,
            audit,
            links_found: Vec::new(),
            elapsed: Duration::from_secs(0),
        }
    }

    pub fn violation_count(&self) -> usize {
        self.audit.violations.len()
    }
}
