//! WebSocket viewer channel.
//!
//! Connect to `/api/v1/ws/flights/{flight}/{date}`. The server sends a `join`
//! message with the current snapshot and the static trajectory, then a
//! `tick` for every sample delivered while the flight plays. Clients steer
//! playback with JSON commands:
//!
//! ```text
//! {"type": "resume"}
//! {"type": "pause"}
//! {"type": "set_rate", "rate": 4.0}
//! {"type": "seek_seconds", "seconds": -30}
//! {"type": "seek_points", "count": 100}
//! {"type": "snapshot"}
//! ```
//!
//! Control is shared: a command from any viewer moves playback for all of them.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use fdr_replay::{JoinPayload, Snapshot, Tick};
use fdr_telemetry::FlightKey;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::{flight_key, SharedState};
use crate::error::ApiError;

/// Commands a viewer may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Resume,
    Pause,
    SetRate { rate: f64 },
    SeekSeconds { seconds: f64 },
    SeekPoints { count: i64 },
    Snapshot,
}

/// Messages pushed to a viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message after connecting
    Join(JoinPayload),
    /// One delivered sample
    Tick(Tick),
    /// Reply to a command that changes or reads playback state
    Snapshot(Snapshot),
    /// Reply to `set_rate` with the applied rate
    Rate { rate: f64 },
    Error { message: String },
}

/// WebSocket handler for one flight.
pub async fn ws_flight_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Path(path): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let key = flight_key(path)?;
    Ok(ws.on_upgrade(move |socket| handle_viewer(socket, state, key)))
}

async fn handle_viewer(mut socket: WebSocket, state: SharedState, key: FlightKey) {
    info!("{}: viewer connected", key);

    // Subscribe before joining so no tick falls between the two.
    let mut ticks = state.hub.subscribe(&key).await;

    let join = match state.engine.join(&key).await {
        Ok(join) => ServerMessage::Join(join),
        Err(e) => {
            warn!("{}: join failed: {}", key, e);
            let _ = send_message(&mut socket, &ServerMessage::Error { message: e.to_string() }).await;
            return;
        }
    };
    if let Err(e) = send_message(&mut socket, &join).await {
        warn!("{}: failed to send join: {}", key, e);
        return;
    }

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientCommand>(text.as_str()) {
                            Ok(cmd) => handle_command(&state, &key, cmd).await,
                            Err(e) => ServerMessage::Error {
                                message: format!("invalid command: {}", e),
                            },
                        };
                        if let Err(e) = send_message(&mut socket, &reply).await {
                            warn!("{}: failed to send reply: {}", key, e);
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!("{}: websocket error: {}", key, e);
                        break;
                    }
                    _ => {}
                }
            }
            tick = ticks.recv() => {
                match tick {
                    Ok(tick) => {
                        if let Err(e) = send_message(&mut socket, &ServerMessage::Tick(tick)).await {
                            debug!("{}: failed to send tick: {}", key, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("{}: slow viewer skipped {} ticks", key, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    drop(ticks);
    info!(
        "{}: viewer disconnected, {} still watching",
        key,
        state.hub.viewer_count(&key).await
    );
}

/// Apply one viewer command to the shared session.
pub(crate) async fn handle_command(
    state: &SharedState,
    key: &FlightKey,
    cmd: ClientCommand,
) -> ServerMessage {
    let result = match cmd {
        ClientCommand::Resume => {
            let sink = state.hub.sink(key).await;
            state.engine.resume(key, sink).await.map(ServerMessage::Snapshot)
        }
        ClientCommand::Pause => state.engine.pause(key).await.map(ServerMessage::Snapshot),
        ClientCommand::SetRate { rate } => state
            .engine
            .set_rate(key, rate)
            .await
            .map(|rate| ServerMessage::Rate { rate }),
        ClientCommand::SeekSeconds { seconds } => state
            .engine
            .seek_seconds(key, seconds)
            .await
            .map(ServerMessage::Snapshot),
        ClientCommand::SeekPoints { count } => state
            .engine
            .seek_points(key, count)
            .await
            .map(ServerMessage::Snapshot),
        ClientCommand::Snapshot => state.engine.snapshot(key).await.map(ServerMessage::Snapshot),
    };

    result.unwrap_or_else(|e| ServerMessage::Error {
        message: e.to_string(),
    })
}

/// Send a message over the WebSocket as JSON text.
async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}
