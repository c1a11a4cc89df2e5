use crate::audit::{PageAuditor, RawAuditOutput};
use crate::error::{Result, ScanError};
use crate::links;
use crate::result::{FrontierEntry, PageAuditResult};
use crate::session::{Page, Session, SessionProvider};
use futures::future::join_all;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Called after each successful audit with (pages audited so far, url).
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Link-following depth relative to the seed (depth 0).
    pub max_depth: usize,
    /// Upper bound on audited pages for the whole crawl.
    pub max_pages: usize,
    /// Batch size: visits that run at the same time.
    pub concurrency: usize,
    pub max_links_per_page: usize,
    pub navigation_timeout: Duration,
    /// Pause after load so client-rendered content can settle.
    pub settle_delay: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 10,
            concurrency: 3,
            max_links_per_page: 10,
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// State of a single crawl invocation. Workers in a batch only touch it
/// through the surrounding mutex.
#[derive(Default)]
struct CrawlState {
    frontier: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    results: Vec<PageAuditResult>,
}

pub struct Crawler {
    config: CrawlConfig,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new() -> Self {
        Self::with_config(CrawlConfig::default())
    }

    pub fn with_config(config: CrawlConfig) -> Self {
        Self {
            config,
            progress_callback: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.config.max_pages = pages;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn with_max_links_per_page(mut self, links: usize) -> Self {
        self.config.max_links_per_page = links;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.config.navigation_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Breadth-first crawl from `seed_url`, auditing each page with `auditor`.
    ///
    /// Only an invalid seed or a session that cannot be opened fail the call;
    /// pages that fail to load or audit are logged and left out. Results are
    /// in completion order.
    pub async fn crawl(
        &self,
        seed_url: &str,
        provider: &dyn SessionProvider,
        auditor: &dyn PageAuditor,
    ) -> Result<Vec<PageAuditResult>> {
        let seed = links::normalize_url(seed_url)?;
        info!(
            "Starting crawl of {} (max depth {}, max pages {}, concurrency {})",
            seed, self.config.max_depth, self.config.max_pages, self.config.concurrency
        );

        let session = provider.open().await?;
        let results = self.run(seed, session.as_ref(), auditor).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close session: {}", e);
        }

        info!("Crawl complete. Audited {} pages", results.len());
        Ok(results)
    }

    async fn run(
        &self,
        seed: String,
        session: &dyn Session,
        auditor: &dyn PageAuditor,
    ) -> Vec<PageAuditResult> {
        let max_pages = self.config.max_pages.max(1);
        let concurrency = self.config.concurrency.max(1);

        let mut initial = CrawlState::default();
        initial.frontier.push_back(FrontierEntry::new(seed, 0));
        let state = Mutex::new(initial);

        let mut batch_number = 0usize;
        loop {
            let batch: Vec<FrontierEntry> = {
                let mut guard = state.lock().await;
                let remaining = max_pages.saturating_sub(guard.results.len());
                if guard.frontier.is_empty() || remaining == 0 {
                    break;
                }
                let size = concurrency.min(remaining).min(guard.frontier.len());
                guard.frontier.drain(..size).collect()
            };

            batch_number += 1;
            debug!("Batch {}: visiting {} URLs", batch_number, batch.len());

            join_all(
                batch
                    .into_iter()
                    .map(|entry| self.visit(entry, &state, session, auditor, max_pages)),
            )
            .await;
        }

        state.into_inner().results
    }

    async fn visit(
        &self,
        entry: FrontierEntry,
        state: &Mutex<CrawlState>,
        session: &dyn Session,
        auditor: &dyn PageAuditor,
        max_pages: usize,
    ) {
        let FrontierEntry { url, depth } = entry;

        // Claim the URL before any work so a concurrent visit cannot take it.
        {
            let mut guard = state.lock().await;
            if depth > self.config.max_depth {
                debug!("Skipping {} (depth {} beyond limit)", url, depth);
                return;
            }
            if !guard.visited.insert(url.clone()) {
                debug!("Skipping {} (already visited)", url);
                return;
            }
        }

        info!("Scanning {} (depth {})", url, depth);
        let started = Instant::now();

        let mut page = match session.new_page().await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to scan {}: {}", url, e);
                return;
            }
        };

        let outcome = self.audit_page(page.as_mut(), &url, depth, auditor).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close page for {}: {}", url, e);
        }

        let (audit, discovered) = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Failed to scan {}: {}", url, e);
                return;
            }
        };

        let completed = {
            let mut guard = state.lock().await;

            let mut result = PageAuditResult::new(url.clone(), depth, audit);
            result.elapsed = started.elapsed();
            result.links_found = discovered;

            let violations = result.violation_count();
            let links = result.links_found.clone();
            guard.results.push(result);

            let mut queued = 0;
            for link in links {
                if guard.results.len() >= max_pages {
                    break;
                }
                if guard.visited.contains(&link) {
                    continue;
                }
                guard.frontier.push_back(FrontierEntry::new(link, depth + 1));
                queued += 1;
            }

            info!(
                "Completed scan for {} ({} violations, {} links queued)",
                url, violations, queued
            );
            guard.results.len()
        };

        if let Some(ref callback) = self.progress_callback {
            callback(completed, url);
        }
    }

    async fn audit_page(
        &self,
        page: &mut dyn Page,
        url: &str,
        depth: usize,
        auditor: &dyn PageAuditor,
    ) -> Result<(RawAuditOutput, Vec<String>)> {
        let timeout = self.config.navigation_timeout;
        match tokio::time::timeout(timeout, page.navigate(url, timeout)).await {
            Ok(navigated) => navigated?,
            Err(_) => {
                return Err(ScanError::Timeout {
                    url: url.to_string(),
                    millis: timeout.as_millis(),
                });
            }
        }

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let audit = auditor.analyze(&*page).await?;

        let discovered = if depth < self.config.max_depth {
            self.discover_links(&*page, url).await
        } else {
            Vec::new()
        };

        Ok((audit, discovered))
    }

    async fn discover_links(&self, page: &dyn Page, url: &str) -> Vec<String> {
        match page.extract_links().await {
            Ok(hrefs) => {
                let base = page.url().unwrap_or(url);
                let links = links::filter_links(base, &hrefs, self.config.max_links_per_page);
                debug!("Found {} crawlable links on {}", links.len(), url);
                links
            }
            Err(e) => {
                warn!("Link extraction failed for {}: {}", url, e);
                Vec::new()
            }
        }
    }
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}
