//! Playback state for one flight/date key.

use std::sync::Arc;
use std::time::Duration;

use fdr_telemetry::{FlightKey, Sample};
use serde::{Deserialize, Serialize};

use crate::pacing;
use crate::sink::Tick;

/// Cursor, rate and play flag over an immutable sample sequence.
///
/// This type holds no timer. The actor that owns it decides when an advance
/// fires; `SessionState` only knows what an advance does.
#[derive(Debug, Clone)]
pub struct SessionState {
    key: FlightKey,
    samples: Arc<[Sample]>,
    cursor: usize,
    playing: bool,
    rate: f64,
}

impl SessionState {
    /// Create an idle session at the first sample, rate 1.
    pub fn new(key: FlightKey, samples: Arc<[Sample]>) -> Self {
        Self {
            key,
            samples,
            cursor: 0,
            playing: false,
            rate: 1.0,
        }
    }

    pub fn key(&self) -> &FlightKey {
        &self.key
    }

    /// Get the current sample index.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Get the total number of samples.
    pub fn total(&self) -> usize {
        self.samples.len()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Get the sample under the cursor (if any).
    pub fn current_sample(&self) -> Option<&Sample> {
        self.samples.get(self.cursor)
    }

    /// Start playing. Returns false when already running or there is
    /// nothing to play, in which case nothing changes.
    pub fn start(&mut self) -> bool {
        if self.playing || self.samples.is_empty() {
            return false;
        }
        self.playing = true;
        true
    }

    /// Stop playing. Idempotent.
    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Store a clamped rate and return it.
    pub fn set_rate(&mut self, rate: f64) -> f64 {
        self.rate = pacing::clamp_rate(rate);
        self.rate
    }

    /// Delay before the sample under the cursor goes out.
    pub fn next_delay(&self) -> Duration {
        pacing::delay_at(&self.samples, self.cursor, self.rate)
    }

    /// Deliver the sample under the cursor and step past it.
    ///
    /// After the final sample the session stops and the cursor stays on the
    /// last index. Returns `None` without side effects when idle or empty.
    pub fn advance(&mut self) -> Option<Tick> {
        if !self.playing {
            return None;
        }
        let Some(sample) = self.samples.get(self.cursor) else {
            self.playing = false;
            return None;
        };
        let tick = Tick {
            key: self.key.clone(),
            index: self.cursor,
            total: self.samples.len(),
            sample: sample.clone(),
        };

        if self.cursor + 1 < self.samples.len() {
            self.cursor += 1;
        } else {
            self.playing = false;
        }
        Some(tick)
    }

    /// Move by `delta_secs` of recorded time. No-op on an empty session.
    pub fn seek_seconds(&mut self, delta_secs: f64) {
        if let Some(index) = pacing::seek_time_index(&self.samples, self.cursor, delta_secs) {
            self.cursor = index;
        }
    }

    /// Move by `delta` records, clamped to the recording. No-op on an empty session.
    pub fn seek_points(&mut self, delta: i64) {
        if let Some(index) = pacing::seek_point_index(self.samples.len(), self.cursor, delta) {
            self.cursor = index;
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from(self)
    }
}

/// Point-in-time summary of a session, sent to viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub key: FlightKey,
    pub cursor: usize,
    pub total: usize,
    pub playing: bool,
    pub rate: f64,
    pub current_sample: Option<Sample>,
}

impl From<&SessionState> for Snapshot {
    fn from(session: &SessionState) -> Self {
        Self {
            key: session.key.clone(),
            cursor: session.cursor,
            total: session.total(),
            playing: session.playing,
            rate: session.rate,
            current_sample: session.current_sample().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fdr_telemetry::Measurements;

    fn make_session(offsets_ms: &[i64]) -> SessionState {
        let samples: Vec<Sample> = offsets_ms
            .iter()
            .enumerate()
            .map(|(i, ms)| {
                let ts = Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap();
                Sample::new(100 + i as u64, ts, Measurements::default())
            })
            .collect();
        let key = FlightKey::parse("AB123", "2024-03-09").unwrap();
        SessionState::new(key, samples.into())
    }

    #[test]
    fn session_starts_idle_at_zero() {
        let session = make_session(&[0, 1000]);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.rate(), 1.0);
        assert!(!session.is_playing());
    }

    #[test]
    fn start_is_refused_when_running_or_empty() {
        let mut session = make_session(&[0, 1000]);
        assert!(session.start());
        assert!(!session.start());
        assert!(session.is_playing());

        let mut empty = make_session(&[]);
        assert!(!empty.start());
        assert!(!empty.is_playing());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut session = make_session(&[0, 1000, 2000]);
        session.seek_points(1);
        session.start();
        session.stop();
        assert_eq!(session.cursor(), 1);
        session.stop();
        assert_eq!(session.cursor(), 1);
        assert!(!session.is_playing());
    }

    #[test]
    fn advance_walks_forward_and_stops_on_last() {
        let mut session = make_session(&[0, 1000, 2000]);
        session.start();

        let indices: Vec<usize> = std::iter::from_fn(|| session.advance())
            .map(|t| t.index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(!session.is_playing());
        assert_eq!(session.cursor(), 2);
        assert!(session.advance().is_none());
    }

    #[test]
    fn advance_from_last_delivers_once() {
        let mut session = make_session(&[0, 1000, 2000]);
        session.seek_points(10);
        session.start();

        let tick = session.advance().unwrap();
        assert_eq!(tick.index, 2);
        assert_eq!(tick.sample.id.0, 102);
        assert!(!session.is_playing());
        assert!(session.advance().is_none());
    }

    #[test]
    fn advance_requires_running() {
        let mut session = make_session(&[0, 1000]);
        assert!(session.advance().is_none());
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn seek_points_clamps_to_bounds() {
        let mut session = make_session(&[0, 1000, 2000, 3000]);
        session.seek_points(2);
        assert_eq!(session.cursor(), 2);
        session.seek_points(-10);
        assert_eq!(session.cursor(), 0);
        session.seek_points(4);
        assert_eq!(session.cursor(), 3);
    }

    #[test]
    fn seek_seconds_uses_recorded_time() {
        let mut session = make_session(&[0, 1000, 2000, 5000]);
        session.seek_seconds(2.0);
        assert_eq!(session.cursor(), 2);
        session.seek_seconds(100.0);
        assert_eq!(session.cursor(), 3);
        session.seek_seconds(-4.5);
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn seeks_on_empty_session_are_noops() {
        let mut session = make_session(&[]);
        session.seek_seconds(5.0);
        session.seek_points(3);
        assert_eq!(session.cursor(), 0);
        assert!(session.current_sample().is_none());
    }

    #[test]
    fn seek_does_not_change_play_flag() {
        let mut session = make_session(&[0, 1000, 2000]);
        session.start();
        session.seek_points(1);
        assert!(session.is_playing());
        session.stop();
        session.seek_seconds(1.0);
        assert!(!session.is_playing());
    }

    #[test]
    fn set_rate_clamps_and_drives_delay() {
        let mut session = make_session(&[0, 1000]);
        assert_eq!(session.set_rate(0.0), 0.1);
        assert_eq!(session.next_delay(), Duration::from_millis(10_000));
        assert_eq!(session.set_rate(4.0), 4.0);
        assert_eq!(session.next_delay(), Duration::from_millis(250));
    }

    #[test]
    fn snapshot_conversion() {
        let mut session = make_session(&[0, 1000, 2000]);
        session.seek_points(1);
        session.set_rate(2.0);

        let snapshot: Snapshot = (&session).into();
        assert_eq!(snapshot.cursor, 1);
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.rate, 2.0);
        assert!(!snapshot.playing);
        assert_eq!(snapshot.current_sample.unwrap().id.0, 101);
    }

    #[test]
    fn empty_snapshot() {
        let snapshot = make_session(&[]).snapshot();
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.cursor, 0);
        assert!(snapshot.current_sample.is_none());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["current_sample"].is_null());
    }
}
