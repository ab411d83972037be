//! FDR Replay Server
//!
//! Serves recorded flights to viewers with VCR-style control.
//!
//! # Architecture
//!
//! - **REST API**: Join, snapshot, resume, pause, rate and seek per flight
//! - **WebSocket**: Streams ticks to viewers and accepts the same commands
//! - **TickHub**: One broadcast channel per flight, shared by its viewers
//! - **ReplayNode**: Wires config, store, engine and router together
//!
//! # Example
//!
//! ```no_run
//! use fdr_replay_server::{ReplayNode, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::from_env()?;
//!     ReplayNode::new(config).run().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod hub;
pub mod node;
pub mod ws;

pub use api::{build_router, AppState};
pub use config::ServerConfig;
pub use error::{ApiError, Error, Result};
pub use hub::TickHub;
pub use node::ReplayNode;
