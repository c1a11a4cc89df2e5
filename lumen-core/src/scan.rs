//! End-to-end scan: crawl, decode, aggregate, score, persist.

use crate::config::ScanConfig;
use crate::decode::{self, Violation};
use crate::error::{ScanSessionError, StoreError};
use crate::score::{self, ImpactCounts};
use crate::store::{ResultStore, ScanStatus, ScannedWebsite, UserStore, normalize_email};
use lumen_scanner::{Crawler, PageAuditor, ProgressCallback, SessionProvider, links};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const SCAN_SUCCEEDED_MESSAGE: &str = "Scan completed & summaries saved";
pub const NO_RESULTS_MESSAGE: &str = "No scan results. Website may block headless browsers.";

/// Decoded findings of one audited page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub url: String,
    pub depth: usize,
    pub issue_count: u64,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub success: bool,
    pub message: String,
    pub scanned_website: ScannedWebsite,
    pub pages: Vec<PageSummary>,
    pub counts: ImpactCounts,
    /// Absent when no page could be audited.
    pub score: Option<f64>,
}

pub struct ScanSession {
    users: Arc<dyn UserStore>,
    results: Arc<dyn ResultStore>,
    provider: Arc<dyn SessionProvider>,
    auditor: Arc<dyn PageAuditor>,
    config: ScanConfig,
    progress_callback: Option<ProgressCallback>,
}

impl ScanSession {
    pub fn new(
        users: Arc<dyn UserStore>,
        results: Arc<dyn ResultStore>,
        provider: Arc<dyn SessionProvider>,
        auditor: Arc<dyn PageAuditor>,
    ) -> Self {
        Self {
            users,
            results,
            provider,
            auditor,
            config: ScanConfig::default(),
            progress_callback: None,
        }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan `seed_url` on behalf of `requester_email`.
    ///
    /// A crawl that reaches no page is reported as an unsuccessful outcome,
    /// not an error. Errors are reserved for bad input, unknown requesters
    /// and collaborator faults.
    pub async fn perform_scan(
        &self,
        seed_url: &str,
        requester_email: &str,
    ) -> Result<ScanOutcome, ScanSessionError> {
        if seed_url.trim().is_empty() {
            return Err(ScanSessionError::InvalidInput(
                "a website URL is required".to_string(),
            ));
        }
        let seed = links::normalize_url(seed_url)
            .map_err(|e| ScanSessionError::InvalidInput(e.to_string()))?;

        if requester_email.trim().is_empty() {
            return Err(ScanSessionError::InvalidInput(
                "a requester email is required".to_string(),
            ));
        }
        let email = normalize_email(requester_email).map_err(|e| match e {
            StoreError::InvalidEmail(_) => ScanSessionError::InvalidInput(e.to_string()),
            other => ScanSessionError::Storage(other),
        })?;

        let user = self
            .users
            .find_by_email(&email)?
            .ok_or_else(|| ScanSessionError::UserNotFound(email.clone()))?;

        let mut crawler = Crawler::with_config(self.config.crawl.clone());
        if let Some(callback) = &self.progress_callback {
            crawler = crawler.with_progress_callback(Arc::clone(callback));
        }

        let pages = crawler
            .crawl(&seed, self.provider.as_ref(), self.auditor.as_ref())
            .await?;

        if pages.is_empty() {
            warn!("No pages could be audited for {}", seed);
            let website = self.results.save_scan(&user, &seed, ScanStatus::Failed)?;
            self.results
                .save_report(&website.id, &seed, ScanStatus::Failed, None)?;

            return Ok(ScanOutcome {
                success: false,
                message: NO_RESULTS_MESSAGE.to_string(),
                scanned_website: website,
                pages: Vec::new(),
                counts: ImpactCounts::default(),
                score: None,
            });
        }

        let website = self.results.save_scan(&user, &seed, ScanStatus::Success)?;

        let mut counts = ImpactCounts::default();
        let mut summaries = Vec::with_capacity(pages.len());
        for page in &pages {
            let violations = decode::decode(&page.audit, &page.url);
            counts.record_all(&violations);

            self.results.save_report(
                &website.id,
                &page.url,
                ScanStatus::Success,
                Some(violations.as_slice()),
            )?;

            summaries.push(PageSummary {
                url: page.url.clone(),
                depth: page.depth,
                issue_count: violations.iter().map(Violation::issue_count).sum(),
                violations,
            });
        }

        let score = score::score_with(&counts, &self.config.weights);
        self.results.save_stats(&website.id, &counts, score)?;

        info!(
            "Scan {} of {} finished: {} pages, {} issues, score {:.1}",
            website.id,
            seed,
            summaries.len(),
            counts.total_issues,
            score
        );

        Ok(ScanOutcome {
            success: true,
            message: SCAN_SUCCEEDED_MESSAGE.to_string(),
            scanned_website: website,
            pages: summaries,
            counts,
            score: Some(score),
        })
    }
}
