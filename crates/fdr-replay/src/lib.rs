//! FDR Replay Session Engine
//!
//! Turns a recorded flight into a controllable, time-paced live stream shared
//! by every viewer of that flight.
//!
//! # Architecture
//!
//! - **ReplayEngine**: Registry of sessions, one per flight/date, loaded lazily
//! - **SessionHandle**: Address of a session task; all mutation goes through it
//! - **SessionState**: Cursor, rate and play flag over the loaded samples
//! - **Pacing**: Recorded inter-sample gaps scaled by rate, with a floor
//! - **TickSink**: Where delivered samples go; fan-out is the caller's job
//!
//! # Usage
//!
//! ```ignore
//! let engine = ReplayEngine::new(Arc::new(store), EngineConfig::default());
//! let key = FlightKey::parse("AB123", "2024-03-09")?;
//!
//! let (ticks, _) = tokio::sync::broadcast::channel(256);
//! engine.resume(&key, Arc::new(ticks)).await?;
//! engine.set_rate(&key, 4.0).await?;
//! engine.seek_seconds(&key, -30.0).await?;
//! ```

mod actor;
mod engine;
mod error;
pub mod pacing;
mod session;
mod sink;

pub use actor::SessionHandle;
pub use engine::{EngineConfig, JoinPayload, ReplayEngine};
pub use error::{Error, Result};
pub use session::{SessionState, Snapshot};
pub use sink::{DeliveryError, FnSink, Tick, TickSink};
