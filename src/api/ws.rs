// =============================================================================
// WebSocket Handler — Push-based view updates
// =============================================================================
//
// Clients connect to `/api/v1/ws` and receive:
//   1. An immediate `snapshot` event holding the full view.
//   2. Every subsequent view event as it is published.
//
// A client that falls behind the broadcast buffer gets a fresh snapshot in
// place of the events it missed. Text frames from the client are session
// commands (same JSON as `POST /api/v1/session`); the reply is either the
// resulting session or an error object.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::command::TransitionRequest;
use crate::api::view_hub::ViewEvent;
use crate::app_state::{AppState, SessionUpdate};

// =============================================================================
// WebSocket upgrade handler
// =============================================================================

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let conn_id = Uuid::new_v4();
    info!(%conn_id, "WebSocket connection accepted — upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, conn_id))
}

// =============================================================================
// Connection handler
// =============================================================================

/// Manages a single WebSocket connection lifecycle.
///
/// Runs two concurrent branches via `tokio::select!`:
///   1. **Push** — forward view events from the hub.
///   2. **Recv** — process client frames (commands, Ping/Pong, Close).
async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>, conn_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let (view, mut events) = state.view.subscribe();
    let mut sequence: u64 = 0;

    if let Err(e) = send_json(&mut sender, &ViewEvent::Snapshot { view }, &mut sequence).await {
        warn!(%conn_id, error = %e, "failed to send initial WebSocket snapshot");
        return;
    }

    loop {
        tokio::select! {
            // ── Push: forward hub events ────────────────────────────────
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%conn_id, skipped, "WebSocket client lagging — resending snapshot");
                        ViewEvent::Snapshot { view: state.view.snapshot() }
                    }
                    Err(RecvError::Closed) => {
                        debug!(%conn_id, "view hub closed");
                        break;
                    }
                };
                if let Err(e) = send_json(&mut sender, &event, &mut sequence).await {
                    debug!(%conn_id, error = %e, "WebSocket send failed — disconnecting");
                    break;
                }
            }

            // ── Recv: process incoming messages ────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_command(&state, &text);
                        if let Err(e) = send_json(&mut sender, &reply, &mut sequence).await {
                            debug!(%conn_id, error = %e, "WebSocket send failed — disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(%conn_id, error = %e, "failed to send Pong — disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        info!(%conn_id, "WebSocket Close frame received — disconnecting");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!(%conn_id, "WebSocket binary message ignored");
                    }
                    Some(Err(e)) => {
                        warn!(%conn_id, error = %e, "WebSocket receive error — disconnecting");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    info!(%conn_id, messages = sequence, "WebSocket connection closed");
}

// =============================================================================
// Helpers
// =============================================================================

/// Reply to a client command frame.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CommandReply {
    Session(SessionUpdate),
    Error {
        error: String,
    },
}

fn handle_command(state: &AppState, text: &str) -> CommandReply {
    let transition = TransitionRequest::from_json(text).and_then(TransitionRequest::into_transition);
    match transition {
        Ok(transition) => CommandReply::Session(state.apply(transition)),
        Err(e) => {
            debug!(error = %e, "WebSocket command rejected");
            CommandReply::Error {
                error: e.to_string(),
            }
        }
    }
}

/// Serialize `payload` and send it as a text frame.
async fn send_json<S, T>(sender: &mut S, payload: &T, sequence: &mut u64) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
    T: Serialize,
{
    match serde_json::to_string(payload) {
        Ok(json) => {
            sender.send(Message::Text(json)).await?;
            *sequence += 1;
            Ok(())
        }
        Err(e) => {
            // Serialisation errors are not network errors; don't disconnect.
            warn!(error = %e, "failed to serialize WebSocket payload");
            Ok(())
        }
    }
}
