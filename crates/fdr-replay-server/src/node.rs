//! Replay node - the main application entry point.
//!
//! Architecture:
//! - One replay engine per process, backed by a read-only telemetry store
//! - One tick hub fanning each flight's ticks out to its viewers
//! - HTTP API + WebSocket endpoint sharing both

use std::sync::Arc;
use std::time::Duration;

use fdr_replay::ReplayEngine;
use fdr_telemetry::{CsvStore, TelemetryStore};

use crate::api::{self, AppState, SharedState};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::hub::TickHub;

/// A replay server instance.
pub struct ReplayNode {
    state: SharedState,
    config: ServerConfig,
}

impl ReplayNode {
    /// Create a node reading telemetry from the configured CSV export.
    pub fn new(config: ServerConfig) -> Self {
        let store = CsvStore::new(config.data_path.clone());
        if !store.path().exists() {
            tracing::warn!(
                "telemetry file {:?} does not exist yet; loads will fail until it does",
                store.path()
            );
        }
        Self::with_store(config, Arc::new(store))
    }

    /// Create a node over any telemetry store.
    pub fn with_store(config: ServerConfig, store: Arc<dyn TelemetryStore>) -> Self {
        let state = Arc::new(AppState {
            engine: ReplayEngine::new(store, config.engine_config()),
            hub: TickHub::new(config.tick_buffer),
        });
        Self { state, config }
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Run the HTTP server until it fails.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Replay node starting");
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Data: {:?}", self.config.data_path);
        match self.config.idle_timeout {
            Some(timeout) => tracing::info!("  Idle eviction: {:?}", timeout),
            None => tracing::info!("  Idle eviction: off"),
        }

        if let Some(period) = self.config.idle_timeout {
            tokio::spawn(sweep_channels(self.state(), period));
        }

        let app = api::build_router(self.state());

        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", listener.local_addr()?);

        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Periodically release hub channels of evicted flights.
async fn sweep_channels(state: SharedState, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        state.prune_channels().await;
    }
}
