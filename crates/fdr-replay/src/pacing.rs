//! Pacing and seek arithmetic over a time-ordered sample slice.
//!
//! Everything here is pure so the session actor stays a thin shell around it.

use std::time::Duration;

use fdr_telemetry::Sample;

/// Slowest accepted playback rate. Anything below, or not finite, is raised to it.
pub const MIN_RATE: f64 = 0.1;

/// Floor between two deliveries, so equal timestamps or huge rates cannot spin.
pub const MIN_DELAY: Duration = Duration::from_millis(10);

/// Clamp a requested playback rate into the accepted range.
pub fn clamp_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate >= MIN_RATE {
        rate
    } else {
        MIN_RATE
    }
}

/// Delay to wait before delivering the sample at `index`.
///
/// It is the recorded gap to the following sample scaled by `rate`, never less
/// than [`MIN_DELAY`]. The last sample has no successor and goes out at once.
pub fn delay_at(samples: &[Sample], index: usize, rate: f64) -> Duration {
    let (Some(current), Some(next)) = (samples.get(index), samples.get(index + 1)) else {
        return Duration::ZERO;
    };
    let gap_ms = (next.timestamp_ms() - current.timestamp_ms()) as f64;
    let scaled = (gap_ms / clamp_rate(rate)).round();
    let min_ms = MIN_DELAY.as_millis() as f64;
    Duration::from_millis(scaled.max(min_ms) as u64)
}

/// Index reached by moving `delta_secs` seconds from the sample at `from`.
///
/// Lands on the rightmost sample whose timestamp does not exceed the target,
/// or on 0 when the target precedes the whole recording. An out of range
/// `from` counts as the first sample. Returns `None` for an empty slice.
pub fn seek_time_index(samples: &[Sample], from: usize, delta_secs: f64) -> Option<usize> {
    let origin = samples.get(from).or_else(|| samples.first())?;
    let offset_ms = (delta_secs * 1000.0).round() as i64;
    let target = origin.timestamp_ms().saturating_add(offset_ms);
    let after = samples.partition_point(|s| s.timestamp_ms() <= target);
    Some(after.saturating_sub(1))
}

/// Index reached by moving `delta` records from `from`, clamped to `[0, len)`.
/// Returns `None` when there are no records.
pub fn seek_point_index(len: usize, from: usize, delta: i64) -> Option<usize> {
    let last = len.checked_sub(1)?;
    let target = i64::try_from(from).unwrap_or(i64::MAX).saturating_add(delta);
    Some(target.clamp(0, last as i64) as usize)
}
