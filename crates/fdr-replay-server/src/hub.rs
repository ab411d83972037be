//! Per-flight tick fan-out.
//!
//! The engine delivers each tick to a single sink. The hub gives every flight
//! key one broadcast channel and hands that channel's sender to the engine as
//! the sink, so all viewers of a flight see the same stream.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fdr_replay::{Tick, TickSink};
use fdr_telemetry::FlightKey;
use tokio::sync::{broadcast, Mutex};

pub struct TickHub {
    capacity: usize,
    channels: Mutex<HashMap<FlightKey, broadcast::Sender<Tick>>>,
}

impl TickHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    async fn channel(&self, key: &FlightKey) -> broadcast::Sender<Tick> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(key.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Sink that reaches every current and future viewer of `key`.
    pub async fn sink(&self, key: &FlightKey) -> Arc<dyn TickSink> {
        Arc::new(self.channel(key).await)
    }

    /// Start receiving ticks for `key`.
    pub async fn subscribe(&self, key: &FlightKey) -> broadcast::Receiver<Tick> {
        self.channel(key).await.subscribe()
    }

    /// Number of viewers currently subscribed to `key`.
    pub async fn viewer_count(&self, key: &FlightKey) -> usize {
        let channels = self.channels.lock().await;
        channels.get(key).map_or(0, |tx| tx.receiver_count())
    }

    /// Number of flights holding a channel.
    pub async fn channel_count(&self) -> usize {
        self.channels.lock().await.len()
    }

    /// Drop channels that no viewer listens on and no live session feeds.
    /// Returns how many were dropped.
    pub async fn prune(&self, live: &HashSet<FlightKey>) -> usize {
        let mut channels = self.channels.lock().await;
        let before = channels.len();
        channels.retain(|key, tx| tx.receiver_count() > 0 || live.contains(key));
        before - channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fdr_telemetry::{Measurements, Sample};

    fn tick(key: &FlightKey, index: usize) -> Tick {
        Tick {
            key: key.clone(),
            index,
            total: 5,
            sample: Sample::new(
                index as u64,
                Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                Measurements::default(),
            ),
        }
    }

    #[tokio::test]
    async fn viewers_of_one_flight_share_ticks() {
        let hub = TickHub::new(8);
        let key = FlightKey::parse("AB123", "2024-03-09").unwrap();
        let mut a = hub.subscribe(&key).await;
        let mut b = hub.subscribe(&key).await;
        assert_eq!(hub.viewer_count(&key).await, 2);

        hub.sink(&key).await.deliver(tick(&key, 4)).unwrap();
        assert_eq!(a.recv().await.unwrap().index, 4);
        assert_eq!(b.recv().await.unwrap().index, 4);
    }

    #[tokio::test]
    async fn flights_are_isolated() {
        let hub = TickHub::new(8);
        let one = FlightKey::parse("AB123", "2024-03-09").unwrap();
        let two = FlightKey::parse("AB123", "2024-03-10").unwrap();
        let mut rx_two = hub.subscribe(&two).await;
        let _rx_one = hub.subscribe(&one).await;

        hub.sink(&one).await.deliver(tick(&one, 0)).unwrap();
        assert!(rx_two.try_recv().is_err());
    }

    #[tokio::test]
    async fn prune_keeps_watched_and_live_channels() {
        let hub = TickHub::new(8);
        let watched = FlightKey::parse("AB123", "2024-03-09").unwrap();
        let live = FlightKey::parse("AB123", "2024-03-10").unwrap();
        let stale = FlightKey::parse("CD456", "2024-03-09").unwrap();

        let _viewer = hub.subscribe(&watched).await;
        let _live_sink = hub.sink(&live).await;
        let _stale_sink = hub.sink(&stale).await;
        assert_eq!(hub.channel_count().await, 3);

        let removed = hub.prune(&HashSet::from([live.clone()])).await;
        assert_eq!(removed, 1);
        assert_eq!(hub.channel_count().await, 2);
        assert_eq!(hub.viewer_count(&watched).await, 1);
    }

    #[tokio::test]
    async fn dropped_viewers_are_not_counted() {
        let hub = TickHub::new(8);
        let key = FlightKey::parse("AB123", "2024-03-09").unwrap();
        let rx = hub.subscribe(&key).await;
        drop(rx);
        assert_eq!(hub.viewer_count(&key).await, 0);
    }
}
