//! HTTP API for replay control.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use fdr_replay::{JoinPayload, ReplayEngine, Snapshot};
use fdr_telemetry::FlightKey;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::hub::TickHub;
use crate::ws::ws_flight_handler;

/// Shared application state.
pub struct AppState {
    pub engine: ReplayEngine,
    pub hub: TickHub,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Drop hub channels for flights with no viewers and no live session.
    pub async fn prune_channels(&self) -> usize {
        let live: HashSet<FlightKey> = self.engine.keys().await.into_iter().collect();
        let removed = self.hub.prune(&live).await;
        if removed > 0 {
            tracing::debug!("pruned {} idle tick channels", removed);
        }
        removed
    }
}

/// Build the API router.
pub fn build_router(state: SharedState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/status", get(status))
        .route("/api/v1/flights/{flight}/{date}", get(join))
        .route("/api/v1/flights/{flight}/{date}/snapshot", get(snapshot))
        .route("/api/v1/flights/{flight}/{date}/resume", post(resume))
        .route("/api/v1/flights/{flight}/{date}/pause", post(pause))
        .route("/api/v1/flights/{flight}/{date}/rate", post(set_rate))
        .route("/api/v1/flights/{flight}/{date}/seek/seconds", post(seek_seconds))
        .route("/api/v1/flights/{flight}/{date}/seek/points", post(seek_points))
        // WebSocket for live ticks and control
        .route("/api/v1/ws/flights/{flight}/{date}", get(ws_flight_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub(crate) fn flight_key((flight, date): (String, String)) -> Result<FlightKey, ApiError> {
    Ok(FlightKey::parse(flight, &date)?)
}

// --- Health endpoints ---

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub sessions: usize,
    pub flights: Vec<String>,
    /// Flights with a tick channel in the hub
    pub channels: usize,
}

async fn status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let keys = state.engine.keys().await;
    Json(StatusResponse {
        status: "ok".into(),
        sessions: keys.len(),
        flights: keys.iter().map(ToString::to_string).collect(),
        channels: state.hub.channel_count().await,
    })
}

// --- Playback endpoints ---

async fn join(
    State(state): State<SharedState>,
    Path(path): Path<(String, String)>,
) -> Result<Json<JoinPayload>, ApiError> {
    let key = flight_key(path)?;
    Ok(Json(state.engine.join(&key).await?))
}

async fn snapshot(
    State(state): State<SharedState>,
    Path(path): Path<(String, String)>,
) -> Result<Json<Snapshot>, ApiError> {
    let key = flight_key(path)?;
    Ok(Json(state.engine.snapshot(&key).await?))
}

async fn resume(
    State(state): State<SharedState>,
    Path(path): Path<(String, String)>,
) -> Result<Json<Snapshot>, ApiError> {
    let key = flight_key(path)?;
    let sink = state.hub.sink(&key).await;
    Ok(Json(state.engine.resume(&key, sink).await?))
}

async fn pause(
    State(state): State<SharedState>,
    Path(path): Path<(String, String)>,
) -> Result<Json<Snapshot>, ApiError> {
    let key = flight_key(path)?;
    Ok(Json(state.engine.pause(&key).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateBody {
    pub rate: f64,
}

async fn set_rate(
    State(state): State<SharedState>,
    Path(path): Path<(String, String)>,
    Json(req): Json<RateBody>,
) -> Result<Json<RateBody>, ApiError> {
    let key = flight_key(path)?;
    let rate = state.engine.set_rate(&key, req.rate).await?;
    Ok(Json(RateBody { rate }))
}

#[derive(Debug, Deserialize)]
pub struct SeekSecondsRequest {
    pub seconds: f64,
}

async fn seek_seconds(
    State(state): State<SharedState>,
    Path(path): Path<(String, String)>,
    Json(req): Json<SeekSecondsRequest>,
) -> Result<Json<Snapshot>, ApiError> {
    let key = flight_key(path)?;
    Ok(Json(state.engine.seek_seconds(&key, req.seconds).await?))
}

#[derive(Debug, Deserialize)]
pub struct SeekPointsRequest {
    pub count: i64,
}

async fn seek_points(
    State(state): State<SharedState>,
    Path(path): Path<(String, String)>,
    Json(req): Json<SeekPointsRequest>,
) -> Result<Json<Snapshot>, ApiError> {
    let key = flight_key(path)?;
    Ok(Json(state.engine.seek_points(&key, req.count).await?))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use chrono::{NaiveDate, NaiveTime};
    use fdr_replay::EngineConfig;
    use fdr_telemetry::{FdrRecord, Measurements, MemoryStore};
    use std::time::Duration;

    /// State over one four-sample flight, AB123 on 2024-03-09.
    pub(crate) fn test_state() -> SharedState {
        test_state_with(EngineConfig::default())
    }

    fn test_state_with(config: EngineConfig) -> SharedState {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let records = [0u32, 1, 2, 5]
            .iter()
            .enumerate()
            .map(|(i, sec)| FdrRecord {
                id: i as u64 + 1,
                flight_number: "AB123".into(),
                date,
                time: NaiveTime::from_hms_opt(10, 0, *sec).unwrap(),
                measurements: Measurements {
                    latitude: Some(51.0),
                    longitude: Some(-0.4),
                    ..Default::default()
                },
            })
            .collect();
        Arc::new(AppState {
            engine: ReplayEngine::new(Arc::new(MemoryStore::new(records)), config),
            hub: TickHub::new(16),
        })
    }

    fn path(date: &str) -> Path<(String, String)> {
        Path(("AB123".to_string(), date.to_string()))
    }

    #[tokio::test(start_paused = true)]
    async fn evicted_flights_release_hub_channels() {
        let state = test_state_with(EngineConfig {
            idle_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        for day in 10..15 {
            let date = format!("2024-03-{}", day);
            resume(State(Arc::clone(&state)), path(&date)).await.unwrap();
        }
        assert_eq!(state.hub.channel_count().await, 5);
        assert_eq!(state.prune_channels().await, 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(state.engine.session_count().await, 0);
        assert_eq!(state.prune_channels().await, 5);
        assert_eq!(state.hub.channel_count().await, 0);
    }

    #[tokio::test]
    async fn watched_flight_keeps_its_channel() {
        let state = test_state();
        let key = FlightKey::parse("AB123", "2024-03-20").unwrap();
        let _viewer = state.hub.subscribe(&key).await;

        assert_eq!(state.prune_channels().await, 0);
        assert_eq!(state.hub.viewer_count(&key).await, 1);
    }

    #[test]
    fn router_builds() {
        let _router = build_router(test_state());
    }

    #[tokio::test]
    async fn join_returns_snapshot_and_path() {
        let state = test_state();
        let Json(payload) = join(State(state), path("2024-03-09")).await.unwrap();
        assert_eq!(payload.snapshot.total, 4);
        assert_eq!(payload.path.len(), 4);
    }

    #[tokio::test]
    async fn bad_date_is_rejected() {
        let state = test_state();
        let err = snapshot(State(state), path("March 9th")).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn seek_endpoints_move_cursor() {
        let state = test_state();
        let Json(snap) = seek_seconds(
            State(Arc::clone(&state)),
            path("2024-03-09"),
            Json(SeekSecondsRequest { seconds: 2.0 }),
        )
        .await
        .unwrap();
        assert_eq!(snap.cursor, 2);

        let Json(snap) = seek_points(
            State(state),
            path("2024-03-09"),
            Json(SeekPointsRequest { count: -5 }),
        )
        .await
        .unwrap();
        assert_eq!(snap.cursor, 0);
    }

    #[tokio::test]
    async fn rate_is_clamped() {
        let state = test_state();
        let Json(body) = set_rate(State(state), path("2024-03-09"), Json(RateBody { rate: 0.0 }))
            .await
            .unwrap();
        assert_eq!(body.rate, 0.1);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_streams_to_hub_and_pause_stops() {
        let state = test_state();
        let key = FlightKey::parse("AB123", "2024-03-09").unwrap();
        let mut viewer = state.hub.subscribe(&key).await;

        let Json(snap) = resume(State(Arc::clone(&state)), path("2024-03-09")).await.unwrap();
        assert!(snap.playing);
        let tick = viewer.recv().await.unwrap();
        assert_eq!(tick.index, 0);

        let Json(snap) = pause(State(Arc::clone(&state)), path("2024-03-09")).await.unwrap();
        assert!(!snap.playing);
        assert_eq!(snap.cursor, 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(viewer.try_recv().is_err());
    }

    #[tokio::test]
    async fn status_lists_sessions() {
        let state = test_state();
        let Json(before) = status(State(Arc::clone(&state))).await;
        assert_eq!(before.sessions, 0);

        snapshot(State(Arc::clone(&state)), path("2024-03-09")).await.unwrap();
        let Json(after) = status(State(state)).await;
        assert_eq!(after.sessions, 1);
        assert_eq!(after.flights, vec!["AB123@2024-03-09".to_string()]);
        assert_eq!(after.channels, 0);
    }
}
