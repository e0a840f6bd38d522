//! Harvest error types

use thiserror::Error;

/// Errors surfaced by the harvest pipeline
///
/// Extraction and probing never produce these: malformed input is dropped and
/// probe failures are recorded on the record itself. What remains are the
/// conditions an operator has to see.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// IO error while reading inputs or writing reports
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP retrieval failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A text report could not be rendered
    #[error("Format error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The admission gate was closed while probes were still queued
    #[error("Admission gate closed")]
    GateClosed,
}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        HarvestError::Http(err.to_string())
    }
}

/// Result type alias using HarvestError
pub type Result<T> = std::result::Result<T, HarvestError>;
