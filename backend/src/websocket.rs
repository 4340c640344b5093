//! WebSocket handlers for real-time updates
//!
//! Each client first receives a snapshot of the workflow run, then every
//! `WorkflowEvent` applied to the store after that snapshot. Supports ping/pong for connection
//! keepalive.

use crate::api::workflow::WorkflowSnapshot;
use crate::pipeline::WorkflowEvent;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{error, info, warn};

/// Messages sent to the client
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full state of the run, sent once on connect
    Snapshot {
        /// Current run
        workflow: WorkflowSnapshot,
    },
    /// A change applied to the run
    WorkflowEvent {
        /// The applied event
        event: WorkflowEvent,
    },
    /// Reply to a client ping
    Pong,
}

/// Messages accepted from the client
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keepalive request
    Ping,
}

/// WebSocket upgrade handler
///
/// # Arguments
/// * `ws` - WebSocket upgrade request
/// * `state` - Application state holding the workflow store
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            error!("Failed to serialize WebSocket message: {}", e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    info!("WebSocket client connected");

    // Events after the snapshot only; the client never sees one twice.
    let (run, subscription) = state.store.snapshot_and_subscribe().await;
    let mut events = BroadcastStream::new(subscription);
    let initial = ServerMessage::Snapshot {
        workflow: WorkflowSnapshot::from(&run),
    };
    if let Some(message) = encode(&initial) {
        if let Err(e) = sender.send(message).await {
            error!("Failed to send initial snapshot: {}", e);
            return;
        }
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                error!("Failed to send message: {}", e);
                break;
            }
        }
    });

    let event_tx = tx.clone();
    let mut event_task = tokio::spawn(async move {
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    let Some(message) = encode(&ServerMessage::WorkflowEvent { event }) else {
                        continue;
                    };
                    if event_tx.send(message).is_err() {
                        break;
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "WebSocket client lagged behind workflow events");
                }
            }
        }
    });

    let ping_tx = tx.clone();
    let mut ping_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;
            if ping_tx.send(Message::Ping(vec![])).is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Ping) => {
                        if let Some(pong) = encode(&ServerMessage::Pong) {
                            if tx.send(pong).is_err() {
                                break;
                            }
                        }
                    }
                    Err(_) => warn!("Received unhandled WebSocket message: {}", text),
                },
                Ok(Message::Close(_)) => {
                    info!("WebSocket client disconnected");
                    break;
                }
                Ok(Message::Pong(_)) => {}
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut event_task => {}
        _ = &mut ping_task => {}
        _ = &mut recv_task => {}
    }
    send_task.abort();
    event_task.abort();
    ping_task.abort();
    recv_task.abort();

    info!("WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StageKind;
    use uuid::Uuid;

    #[test]
    fn test_client_ping_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"reset"}"#).is_err());
    }

    #[test]
    fn test_event_message_shape() {
        let run_id = Uuid::new_v4();
        let message = ServerMessage::WorkflowEvent {
            event: WorkflowEvent::StageStarted {
                run_id,
                stage: StageKind::Architecture,
                log: "designing".to_string(),
            },
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "workflow_event");
        assert_eq!(value["event"]["type"], "stage_started");
        assert_eq!(value["event"]["stage"], "architecture");

        let pong = serde_json::to_value(ServerMessage::Pong).unwrap();
        assert_eq!(pong["type"], "pong");
    }
}
