//! Page-loading capabilities used by the crawler.
//!
//! A [`SessionProvider`] is opened once per crawl; each concurrent visit asks
//! the resulting [`Session`] for its own [`Page`]. The HTTP implementation
//! here fetches server-rendered markup with a pooled `reqwest` client.

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Session>>;
}

#[async_trait]
pub trait Session: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn Page>>;
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait Page: Send + Sync {
    /// Load `url`, failing with `Navigation` or `Timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Raw `href` values of the page's anchors, resolved against the page URL.
    async fn extract_links(&self) -> Result<Vec<String>>;

    async fn close(&mut self) -> Result<()>;

    /// URL of the loaded document after redirects.
    fn url(&self) -> Option<&str>;

    /// Markup of the loaded document.
    fn html(&self) -> Option<&str>;
}

/// Settings resolved once at process start and injected into the provider.
#[derive(Debug, Clone)]
pub struct HttpSessionConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for HttpSessionConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "Mozilla/5.0 (compatible; Lumen/{}; +https://github.com/lumen-a11y/lumen)",
                env!("CARGO_PKG_VERSION")
            ),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 5,
        }
    }
}

pub struct HttpSessionProvider {
    config: HttpSessionConfig,
}

impl HttpSessionProvider {
    pub fn new(config: HttpSessionConfig) -> Self {
        Self { config }
    }
}

impl Default for HttpSessionProvider {
    fn default() -> Self {
        Self::new(HttpSessionConfig::default())
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn open(&self) -> Result<Box<dyn Session>> {
        let client = Client::builder()
            .user_agent(self.config.user_agent.clone())
            .connect_timeout(self.config.connect_timeout)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(self.config.max_redirects))
            .build()?;

        debug!("HTTP session opened");
        Ok(Box::new(HttpSession {
            client,
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct HttpSession {
    client: Client,
    closed: AtomicBool,
}

#[async_trait]
impl Session for HttpSession {
    async fn new_page(&self) -> Result<Box<dyn Page>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ScanError::Session("session is closed".to_string()));
        }
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            url: None,
            html: None,
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        debug!("HTTP session closed");
        Ok(())
    }
}

pub struct HttpPage {
    client: Client,
    url: Option<String>,
    html: Option<String>,
}

#[async_trait]
impl Page for HttpPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let navigation_error = |reason: String| ScanError::Navigation {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScanError::Timeout {
                        url: url.to_string(),
                        millis: timeout.as_millis(),
                    }
                } else {
                    navigation_error(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(navigation_error(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("text/html") && !content_type.contains("xhtml") {
            return Err(navigation_error(format!(
                "not an HTML document ({})",
                if content_type.is_empty() {
                    "no content type"
                } else {
                    content_type.as_str()
                }
            )));
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        debug!("Loaded {} ({} bytes)", final_url, body.len());
        self.url = Some(final_url);
        self.html = Some(body);
        Ok(())
    }

    async fn extract_links(&self) -> Result<Vec<String>> {
        let (Some(url), Some(html)) = (self.url.as_deref(), self.html.as_deref()) else {
            return Err(ScanError::LinkExtraction("page is not loaded".to_string()));
        };
        anchor_hrefs(url, html)
    }

    async fn close(&mut self) -> Result<()> {
        self.html = None;
        Ok(())
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }
}

/// Collect the `href` of every anchor, resolved the way a browser exposes
/// `HTMLAnchorElement.href`. Unresolvable values are passed through as-is.
fn anchor_hrefs(page_url: &str, html: &str) -> Result<Vec<String>> {
    let base = Url::parse(page_url).map_err(|e| ScanError::LinkExtraction(e.to_string()))?;
    let selector = Selector::parse("a[href]")
        .map_err(|e| ScanError::LinkExtraction(format!("invalid selector: {:?}", e)))?;

    let document = Html::parse_document(html);
    let hrefs = document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| {
            base.join(href.trim())
                .map(|resolved| resolved.to_string())
                .unwrap_or_else(|_| href.to_string())
        })
        .collect();

    Ok(hrefs)
}
