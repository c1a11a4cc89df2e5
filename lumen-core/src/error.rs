use lumen_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ScanSessionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Crawl failed: {0}")]
    Crawl(#[from] ScanError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}
