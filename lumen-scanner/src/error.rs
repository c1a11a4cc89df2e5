use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Navigation to {url} timed out after {millis}ms")]
    Timeout { url: String, millis: u128 },

    #[error("Audit failed: {0}")]
    Audit(String),

    #[error("Link extraction failed: {0}")]
    LinkExtraction(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
