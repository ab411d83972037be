//! Error types for telemetry stores.

use thiserror::Error;

/// Result type for telemetry operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while loading telemetry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or read
    #[error("telemetry store unavailable: {0}")]
    Unavailable(String),

    /// A flight key could not be constructed
    #[error("invalid flight key: {0}")]
    InvalidKey(String),

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

