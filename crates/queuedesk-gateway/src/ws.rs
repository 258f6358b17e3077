// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint for display clients.
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "queue_update", "version": 7, "data": [...], "currently_playing": {...},
//!  "service_stats": {...}, "timestamp": "..."}
//! ```
//!
//! Client -> Server: protocol Pong frames or `{"type": "pong"}` acknowledge
//! liveness. Anything else is ignored.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use queuedesk_core::QueueDeskError;
use queuedesk_realtime::ClientSink;

use crate::server::AppState;

/// Write half of an upgraded socket, owned by the broadcast hub.
struct WsSink {
    sender: SplitSink<WebSocket, Message>,
}

fn socket_error(what: &str, e: axum::Error) -> QueueDeskError {
    QueueDeskError::Channel {
        message: format!("websocket {what} failed: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl ClientSink for WsSink {
    async fn send_text(&mut self, text: Arc<str>) -> Result<(), QueueDeskError> {
        self.sender
            .send(Message::Text(text.as_ref().into()))
            .await
            .map_err(|e| socket_error("write", e))
    }

    async fn send_ping(&mut self) -> Result<(), QueueDeskError> {
        self.sender
            .send(Message::Ping(Bytes::new()))
            .await
            .map_err(|e| socket_error("ping", e))
    }

    async fn close(&mut self) {
        let _ = self.sender.send(Message::Close(None)).await;
        let _ = self.sender.close().await;
    }
}

#[derive(Debug, Deserialize)]
struct Inbound {
    #[serde(rename = "type")]
    kind: String,
}

/// Whether a text frame is a liveness acknowledgment.
fn is_pong(text: &str) -> bool {
    serde_json::from_str::<Inbound>(text).is_ok_and(|m| m.kind == "pong")
}

/// GET /ws/queue
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let client = state.hub.connect(Box::new(WsSink { sender })).await;
    let read_timeout = state.read_timeout;

    loop {
        let next = tokio::select! {
            _ = client.closed() => break,
            next = tokio::time::timeout(read_timeout, receiver.next()) => next,
        };
        match next {
            Err(_) => {
                tracing::info!(client = %client.id(), "display client silent, closing");
                break;
            }
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) => break,
            Ok(Some(Err(e))) => {
                tracing::debug!(client = %client.id(), error = %e, "websocket read failed");
                break;
            }
            Ok(Some(Ok(Message::Pong(_)))) => client.touch(),
            Ok(Some(Ok(Message::Text(text)))) => {
                if is_pong(&text) {
                    client.touch();
                }
            }
            Ok(Some(Ok(_))) => {}
        }
    }

    state.hub.disconnect(client.id()).await;
}
