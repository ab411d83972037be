//! Read-only telemetry stores.
//!
//! A store answers one question: given a flight number and a date, which
//! samples were recorded, in time order. Lookup first tries the flight number
//! exactly as given; when that finds nothing it retries ignoring case and
//! whitespace, since recorder exports are inconsistent about both.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sample::{normalize_flight, FlightKey, Measurements, Sample};

/// Source of recorded samples for a flight/date key.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Load every sample for `key`, sorted by time of day then by id.
    ///
    /// An unknown flight is not an error: it yields an empty vector.
    async fn load_flight(&self, key: &FlightKey) -> Result<Vec<Sample>>;
}

/// One stored row, before it is keyed and ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FdrRecord {
    pub id: u64,
    pub flight_number: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(flatten)]
    pub measurements: Measurements,
}

impl FdrRecord {
    pub fn to_sample(&self) -> Sample {
        let timestamp = self.date.and_time(self.time).and_utc();
        Sample::new(self.id, timestamp, self.measurements.clone())
    }
}

/// Pick the records belonging to `key` and order them for playback.
pub(crate) fn select_flight<'a, I>(records: I, key: &FlightKey) -> Vec<Sample>
where
    I: IntoIterator<Item = &'a FdrRecord> + Clone,
{
    let mut hits: Vec<&FdrRecord> = records
        .clone()
        .into_iter()
        .filter(|r| r.date == key.date && r.flight_number == key.flight_number)
        .collect();

    if hits.is_empty() {
        let wanted = key.normalized_flight();
        hits = records
            .into_iter()
            .filter(|r| r.date == key.date && normalize_flight(&r.flight_number) == wanted)
            .collect();
        if !hits.is_empty() {
            tracing::debug!(
                "{}: exact flight match empty, normalized match found {} records",
                key,
                hits.len()
            );
        }
    }

    hits.sort_by(|a, b| a.time.cmp(&b.time).then(a.id.cmp(&b.id)));
    hits.into_iter().map(FdrRecord::to_sample).collect()
}

/// Store backed by records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<FdrRecord>,
}

impl MemoryStore {
    pub fn new(records: Vec<FdrRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn load_flight(&self, key: &FlightKey) -> Result<Vec<Sample>> {
        Ok(select_flight(&self.records, key))
    }
}
