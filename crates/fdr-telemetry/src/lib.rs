//! FDR Telemetry
//!
//! Flight data recorder samples and the read-only stores that serve them.
//!
//! # Architecture
//!
//! - **Sample**: One recorded instant, every measurement optional
//! - **FlightKey**: Flight number + date, the unit of replay
//! - **TelemetryStore**: Loads a flight's samples in time order
//! - **MemoryStore / CsvStore**: In-memory and CSV export backed stores

pub mod csv_store;
pub mod error;
pub mod sample;
pub mod store;

pub use csv_store::CsvStore;
pub use error::{Result, StoreError};
pub use sample::{
    normalize_flight, static_path, FlightKey, GeoPoint, Measurements, PathPoint, Sample, SampleId,
};
pub use store::{FdrRecord, MemoryStore, TelemetryStore};
