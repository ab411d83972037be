//! Session registry and the engine-facing operations.
//!
//! Sessions are created lazily, one per flight/date key, and shared by every
//! viewer of that key. The first reference loads the samples from the store;
//! concurrent first references wait on the same load instead of issuing their
//! own.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fdr_telemetry::{static_path, FlightKey, PathPoint, TelemetryStore};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};

use crate::actor::SessionHandle;
use crate::error::{Error, Result};
use crate::session::Snapshot;
use crate::sink::TickSink;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Drop sessions that sit idle this long. `None` keeps them forever.
    pub idle_timeout: Option<Duration>,
    /// Capacity of each session's command queue
    pub command_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            command_buffer: 64,
        }
    }
}

/// What a viewer receives when it joins a flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPayload {
    pub snapshot: Snapshot,
    /// Every positioned sample, for drawing the whole trajectory up front
    pub path: Vec<PathPoint>,
}

type Slot = Arc<OnceCell<SessionHandle>>;

/// Owner of every replay session in the process.
pub struct ReplayEngine {
    store: Arc<dyn TelemetryStore>,
    config: EngineConfig,
    sessions: Mutex<HashMap<FlightKey, Slot>>,
}

impl ReplayEngine {
    pub fn new(store: Arc<dyn TelemetryStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Return the session for `key`, loading it on first reference.
    ///
    /// A failed load registers nothing; the next call tries again.
    pub async fn ensure_session(&self, key: &FlightKey) -> Result<SessionHandle> {
        let slot = {
            let mut sessions = self.sessions.lock().await;
            let evicted = sessions
                .get(key)
                .and_then(|slot| slot.get())
                .is_some_and(SessionHandle::is_closed);
            if evicted {
                tracing::debug!("{}: previous session was evicted", key);
                sessions.remove(key);
            }
            Arc::clone(sessions.entry(key.clone()).or_default())
        };

        match slot.get_or_try_init(|| self.load_session(key)).await {
            Ok(handle) => Ok(handle.clone()),
            Err(e) => {
                let mut sessions = self.sessions.lock().await;
                if sessions
                    .get(key)
                    .is_some_and(|s| Arc::ptr_eq(s, &slot) && !s.initialized())
                {
                    sessions.remove(key);
                }
                Err(e)
            }
        }
    }

    async fn load_session(&self, key: &FlightKey) -> Result<SessionHandle> {
        let samples = self
            .store
            .load_flight(key)
            .await
            .map_err(|source| Error::StoreUnavailable {
                key: key.clone(),
                source,
            })?;
        tracing::info!("{}: session created with {} samples", key, samples.len());
        Ok(SessionHandle::spawn(
            key.clone(),
            samples.into(),
            self.config.command_buffer,
            self.config.idle_timeout,
        ))
    }

    /// Run `op` on the session for `key`, retrying once if the session was
    /// evicted between lookup and use.
    async fn with_session<T, F, Fut>(&self, key: &FlightKey, op: F) -> Result<T>
    where
        F: Fn(SessionHandle) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let handle = self.ensure_session(key).await?;
        match op(handle).await {
            Err(Error::SessionClosed(_)) => op(self.ensure_session(key).await?).await,
            other => other,
        }
    }

    /// Current state of the session, creating it if needed.
    pub async fn snapshot(&self, key: &FlightKey) -> Result<Snapshot> {
        self.with_session(key, |h| async move { h.snapshot().await })
            .await
    }

    /// Snapshot plus the static trajectory, sent once when a viewer joins.
    pub async fn join(&self, key: &FlightKey) -> Result<JoinPayload> {
        self.with_session(key, |h| async move {
            let snapshot = h.snapshot().await?;
            Ok(JoinPayload {
                snapshot,
                path: static_path(h.samples()),
            })
        })
        .await
    }

    /// Start delivering ticks to `sink`.
    pub async fn resume(&self, key: &FlightKey, sink: Arc<dyn TickSink>) -> Result<Snapshot> {
        self.with_session(key, |h| {
            let sink = Arc::clone(&sink);
            async move { h.resume(sink).await }
        })
        .await
    }

    pub async fn pause(&self, key: &FlightKey) -> Result<Snapshot> {
        self.with_session(key, |h| async move { h.pause().await })
            .await
    }

    /// Returns the rate actually applied after clamping.
    pub async fn set_rate(&self, key: &FlightKey, rate: f64) -> Result<f64> {
        self.with_session(key, |h| async move { h.set_rate(rate).await })
            .await
    }

    pub async fn seek_seconds(&self, key: &FlightKey, seconds: f64) -> Result<Snapshot> {
        self.with_session(key, |h| async move { h.seek_seconds(seconds).await })
            .await
    }

    pub async fn seek_points(&self, key: &FlightKey, count: i64) -> Result<Snapshot> {
        self.with_session(key, |h| async move { h.seek_points(count).await })
            .await
    }

    /// Keys with a live session.
    pub async fn keys(&self) -> Vec<FlightKey> {
        let sessions = self.sessions.lock().await;
        sessions
            .iter()
            .filter(|(_, slot)| slot.get().is_some_and(|h| !h.is_closed()))
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub async fn session_count(&self) -> usize {
        self.keys().await.len()
    }
}
