//! CSV file backed telemetry store.
//!
//! Expected header (column order is free, unknown columns are ignored):
//!
//! ```text
//! id,flight_number,date,time,latitude,longitude,pressure_altitude,radio_altitude,
//! computed_airspeed,ground_speed,vertical_speed,heading,pitch,roll,flap_position,
//! gear_down,autopilot_engaged,on_ground
//! ```
//!
//! Empty or unparseable measurement cells load as unknown. The file is read
//! on every load; callers that want caching keep the returned samples.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::error::{Result, StoreError};
use crate::sample::{FlightKey, Measurements, Sample};
use crate::store::{select_flight, FdrRecord, TelemetryStore};

#[derive(Debug, Deserialize)]
struct CsvRow {
    id: u64,
    flight_number: String,
    date: String,
    time: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pressure_altitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    radio_altitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    computed_airspeed: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    ground_speed: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    vertical_speed: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    heading: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pitch: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    roll: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    flap_position: Option<f64>,
    #[serde(default)]
    gear_down: Option<String>,
    #[serde(default)]
    autopilot_engaged: Option<String>,
    #[serde(default)]
    on_ground: Option<String>,
}

impl CsvRow {
    fn into_record(self) -> Option<FdrRecord> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()?;
        let time = parse_time(&self.time)?;
        Some(FdrRecord {
            id: self.id,
            flight_number: self.flight_number,
            date,
            time,
            measurements: Measurements {
                latitude: self.latitude,
                longitude: self.longitude,
                pressure_altitude: self.pressure_altitude,
                radio_altitude: self.radio_altitude,
                computed_airspeed: self.computed_airspeed,
                ground_speed: self.ground_speed,
                vertical_speed: self.vertical_speed,
                heading: self.heading,
                pitch: self.pitch,
                roll: self.roll,
                flap_position: self.flap_position,
                gear_down: self.gear_down.as_deref().and_then(parse_flag),
                autopilot_engaged: self.autopilot_engaged.as_deref().and_then(parse_flag),
                on_ground: self.on_ground.as_deref().and_then(parse_flag),
            },
        })
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Interpret a discrete recorder flag. Anything unrecognized is unknown.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" | "down" | "engaged" | "ground" => Some(true),
        "0" | "false" | "no" | "n" | "off" | "up" | "disengaged" | "air" => Some(false),
        _ => None,
    }
}

/// Read every well-formed record from a CSV file.
pub fn read_records(path: &Path) -> Result<Vec<FdrRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("{}: skipping row {}: {}", path.display(), line + 2, e);
                continue;
            }
        };
        match row.into_record() {
            Some(record) => records.push(record),
            None => tracing::warn!(
                "{}: skipping row {}: unparseable date or time",
                path.display(),
                line + 2
            ),
        }
    }
    Ok(records)
}

/// Store reading a single CSV export from disk.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TelemetryStore for CsvStore {
    async fn load_flight(&self, key: &FlightKey) -> Result<Vec<Sample>> {
        let path = self.path.clone();
        let records = tokio::task::spawn_blocking(move || read_records(&path))
            .await
            .map_err(|e| StoreError::Unavailable(format!("loader task failed: {}", e)))?
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", self.path.display(), e)))?;

        let samples = select_flight(&records, key);
        tracing::debug!(
            "{}: {} of {} records belong to {}",
            self.path.display(),
            samples.len(),
            records.len(),
            key
        );
        Ok(samples)
    }
}
