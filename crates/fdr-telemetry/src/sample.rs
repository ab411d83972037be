//! Recorded flight samples and the flight/date key they are grouped under.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Identity of one recorded flight: the flight number flown on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightKey {
    pub flight_number: String,
    pub date: NaiveDate,
}

impl FlightKey {
    /// Create a key from an already parsed date.
    pub fn new(flight_number: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            flight_number: flight_number.into(),
            date,
        }
    }

    /// Create a key from a `YYYY-MM-DD` date string.
    pub fn parse(flight_number: impl Into<String>, date: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|e| StoreError::InvalidKey(format!("date {:?}: {}", date, e)))?;
        Ok(Self::new(flight_number, date))
    }

    /// Flight number upper-cased with all whitespace removed.
    pub fn normalized_flight(&self) -> String {
        normalize_flight(&self.flight_number)
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.flight_number, self.date.format("%Y-%m-%d"))
    }
}

/// Case and whitespace insensitive form of a flight number.
pub fn normalize_flight(flight_number: &str) -> String {
    flight_number
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Stable record identifier, unique within one flight/date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(pub u64);

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Instrument values captured in one record.
///
/// Every field is optional. `None` means the recorder did not capture the
/// value and is serialized as `null`; it is never folded into zero or false.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    /// Degrees, positive north
    pub latitude: Option<f64>,
    /// Degrees, positive east
    pub longitude: Option<f64>,
    /// Feet
    pub pressure_altitude: Option<f64>,
    /// Feet above ground
    pub radio_altitude: Option<f64>,
    /// Knots
    pub computed_airspeed: Option<f64>,
    /// Knots
    pub ground_speed: Option<f64>,
    /// Feet per minute
    pub vertical_speed: Option<f64>,
    /// Degrees
    pub heading: Option<f64>,
    /// Degrees, nose up positive
    pub pitch: Option<f64>,
    /// Degrees, right wing down positive
    pub roll: Option<f64>,
    /// Degrees of flap deflection
    pub flap_position: Option<f64>,
    pub gear_down: Option<bool>,
    pub autopilot_engaged: Option<bool>,
    pub on_ground: Option<bool>,
}

impl Measurements {
    /// Position, only when both coordinates were recorded.
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// One flight data recorder record. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub measurements: Measurements,
}

impl Sample {
    pub fn new(id: u64, timestamp: DateTime<Utc>, measurements: Measurements) -> Self {
        Self {
            id: SampleId(id),
            timestamp,
            measurements,
        }
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// One vertex of the static trajectory sent to a viewer on join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub id: SampleId,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// Every sample that carries a position, in sample order.
pub fn static_path(samples: &[Sample]) -> Vec<PathPoint> {
    samples
        .iter()
        .filter_map(|s| {
            s.measurements.position().map(|p| PathPoint {
                id: s.id,
                timestamp: s.timestamp,
                latitude: p.latitude,
                longitude: p.longitude,
                altitude: s.measurements.pressure_altitude,
            })
        })
        .collect()
}
