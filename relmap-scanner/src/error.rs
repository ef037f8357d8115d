use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected status {status} for {path}")]
    UnexpectedStatus { path: String, status: u16 },

    #[error("Malformed document at {path}: {reason}")]
    MalformedDocument { path: String, reason: String },

    #[error("No links found in document")]
    NoLinksFound,

    #[error("No resource name can be inferred from {0}")]
    EmptyResourceName(String),

    #[error("Invalid path pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
