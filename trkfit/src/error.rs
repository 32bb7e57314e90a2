//! Error types for segment finding.
//!
//! Only configuration validation and file I/O fail; per-station anomalies
//! are logged and skipped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackFitError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrackFitError>;
