//! Error types for fdr-replay.

use fdr_telemetry::{FlightKey, StoreError};
use thiserror::Error;

/// Result type for replay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while replaying a flight.
#[derive(Debug, Error)]
pub enum Error {
    /// Samples for a new session could not be loaded. Nothing was registered.
    #[error("telemetry store unavailable for {key}: {source}")]
    StoreUnavailable {
        key: FlightKey,
        #[source]
        source: StoreError,
    },

    /// The session task stopped before answering.
    #[error("session {0} is no longer running")]
    SessionClosed(FlightKey),
}
