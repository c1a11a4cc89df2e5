//! Link filtering and URL normalization for the crawl frontier.
//!
//! Every URL that enters the visited set goes through [`normalize_url`] or
//! [`resolve_link`], so two spellings of the same page (`https://a.test` and
//! `https://a.test/#top`) collapse to one key.

use crate::error::{Result, ScanError};
use std::collections::HashSet;
use url::Url;

const SKIPPED_SCHEMES: [&str; 3] = ["mailto:", "tel:", "javascript:"];

/// Normalize an absolute http(s) URL: parse, drop the fragment, re-serialize.
pub fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScanError::InvalidUrl("URL is empty".to_string()));
    }

    let mut url =
        Url::parse(trimmed).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

    if !is_http(&url) {
        return Err(ScanError::InvalidUrl(format!(
            "{}: only http and https URLs can be scanned",
            trimmed
        )));
    }

    url.set_fragment(None);
    Ok(url.to_string())
}

/// Resolve an anchor `href` found on `base` into a normalized absolute URL.
///
/// Returns `None` for fragment-only links, `mailto:`/`tel:`/`javascript:`
/// links, and anything that does not resolve to http or https.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !is_http(&resolved) {
        return None;
    }

    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Filter the raw hrefs of one page down to at most `cap` crawlable links,
/// keeping discovery order and dropping repeats.
pub fn filter_links(page_url: &str, hrefs: &[String], cap: usize) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    hrefs
        .iter()
        .filter_map(|href| resolve_link(&base, href))
        .filter(|link| seen.insert(link.clone()))
        .take(cap)
        .collect()
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
