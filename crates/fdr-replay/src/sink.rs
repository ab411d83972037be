//! Tick delivery.
//!
//! The scheduler hands every delivered sample to a [`TickSink`] and moves on.
//! Delivery is best effort: a failing sink is logged, never retried, and never
//! stops the session from advancing.

use fdr_telemetry::{FlightKey, Sample};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

/// One sample delivered during active playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub key: FlightKey,
    /// Position of `sample` within the session
    pub index: usize,
    pub total: usize,
    pub sample: Sample,
}

/// A sink refused or could not accept a tick.
#[derive(Debug, Clone, Error)]
#[error("tick delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Receiver of ticks for one session.
pub trait TickSink: Send + Sync {
    fn deliver(&self, tick: Tick) -> Result<(), DeliveryError>;
}

impl TickSink for broadcast::Sender<Tick> {
    fn deliver(&self, tick: Tick) -> Result<(), DeliveryError> {
        self.send(tick)
            .map(|_| ())
            .map_err(|_| DeliveryError("no viewers subscribed".into()))
    }
}

impl TickSink for mpsc::UnboundedSender<Tick> {
    fn deliver(&self, tick: Tick) -> Result<(), DeliveryError> {
        self.send(tick)
            .map_err(|_| DeliveryError("receiver dropped".into()))
    }
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

impl<F> TickSink for FnSink<F>
where
    F: Fn(Tick) -> Result<(), DeliveryError> + Send + Sync,
{
    fn deliver(&self, tick: Tick) -> Result<(), DeliveryError> {
        (self.0)(tick)
    }
}
