//! Error types for chaincheck

use thiserror::Error;

/// Fatal conditions that stop a check run before a report can be produced.
///
/// Comparison outcomes (a mismatch between nodes, a missed target) are not
/// errors; they end up as failed [`crate::report::CheckResult`]s instead.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Chain dump command failed: {0}")]
    Command(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Node error at {endpoint}: {message}")]
    Node { endpoint: String, message: String },
    #[error("Expected {expected} clients in chain dump, found {found}")]
    TooFewClients { expected: usize, found: usize },
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for CheckError {
    fn from(err: reqwest::Error) -> Self {
        CheckError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for CheckError {
    fn from(err: serde_json::Error) -> Self {
        CheckError::Decode(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for CheckError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        CheckError::Decode(err.to_string())
    }
}

impl From<toml::de::Error> for CheckError {
    fn from(err: toml::de::Error) -> Self {
        CheckError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, CheckError>;
