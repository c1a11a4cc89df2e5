// Storage capabilities consumed by the scan session

use crate::decode::Violation;
use crate::error::StoreError;
use crate::score::ImpactCounts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Success,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Success => "success",
            ScanStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ScanStatus::Success),
            "failed" => Ok(ScanStatus::Failed),
            other => Err(format!("unknown scan status: {}", other)),
        }
    }
}

/// One scan of one seed URL, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedWebsite {
    pub id: String,
    pub user_id: i64,
    pub url: String,
    pub status: ScanStatus,
    pub created_at: i64,
}

/// Decoded violations of a single page. `violations` is empty for failed rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub id: i64,
    pub website_id: String,
    pub url: String,
    pub status: ScanStatus,
    pub violations: Vec<Violation>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub website_id: String,
    pub counts: ImpactCounts,
    pub score: f64,
    pub created_at: i64,
}

pub trait UserStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// Write side of a scan. Writes are not transactional across calls.
pub trait ResultStore: Send + Sync {
    fn save_scan(&self, user: &User, url: &str, status: ScanStatus)
    -> Result<ScannedWebsite, StoreError>;

    fn save_report(
        &self,
        website_id: &str,
        page_url: &str,
        status: ScanStatus,
        violations: Option<&[Violation]>,
    ) -> Result<(), StoreError>;

    fn save_stats(
        &self,
        website_id: &str,
        counts: &ImpactCounts,
        score: f64,
    ) -> Result<(), StoreError>;
}

/// Trim and lower-case an email address, rejecting anything that is not
/// shaped like `local@domain.tld`.
pub fn normalize_email(email: &str) -> Result<String, StoreError> {
    let normalized = email.trim().to_lowercase();
    let invalid = || StoreError::InvalidEmail(email.trim().to_string());

    if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || !domain.contains('.')
    {
        return Err(invalid());
    }

    Ok(normalized)
}
