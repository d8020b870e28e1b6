//! WebSocket subscription endpoint.
//!
//! # Data Flow
//! ```text
//! GET /ws?client_id=..&tags=a,b
//!     → upgrade
//!     → ChannelSink registered under client_id
//!     → writer task: sink channel → socket (each write bounded by send_timeout)
//!     → reader loop: subscribe / unsubscribe / ping
//!     → on close: unregister (unless a newer connection took the id)
//!     → a superseded connection closes on its next inbound message
//! ```

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::broadcast::message::{Connected, Pong, Subscribed};
use crate::broadcast::{ChannelSink, ClientRegistry, ClientSink, OutboundFrame, Payload};
use crate::http::protocol::{parse_client_message, parse_tag_list, ClientMessage, ProtocolError};
use crate::http::server::AppState;
use crate::time::now_millis;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    /// Caller-chosen id; a random one is assigned when absent.
    pub client_id: Option<String>,
    /// Comma separated initial tags.
    pub tags: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let client_id = params
        .client_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let tags = parse_tag_list(params.tags.as_deref());

    ws.on_upgrade(move |socket| handle_socket(socket, state, client_id, tags))
}

async fn handle_socket(socket: WebSocket, state: AppState, client_id: String, tags: Vec<String>) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (sink, rx) = ChannelSink::new(state.config.server.client_buffer_size);
    let sink: Arc<dyn ClientSink> = Arc::new(sink);
    let registry = state.broadcaster.registry().clone();
    let send_timeout = Duration::from_secs(state.config.server.send_timeout_secs);

    registry.register(client_id.clone(), sink.clone(), tags.clone());
    let mut writer = tokio::spawn(write_frames(ws_tx, rx, send_timeout, client_id.clone()));

    registry.send(
        &client_id,
        &Payload::Connected(Connected {
            client_id: client_id.clone(),
            tags,
        }),
    );

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::debug!(client_id = %client_id, error = %e, "WebSocket read failed");
                        break;
                    }
                    None => break,
                };
                // A newer connection registered the same id; this one must not act on it.
                if !registry.is_current_sink(&client_id, &sink) {
                    tracing::debug!(client_id = %client_id, "Connection superseded, closing");
                    break;
                }
                match msg {
                    Message::Text(text) => handle_text(&registry, &client_id, text.as_str()),
                    Message::Binary(_) => {
                        registry.send_error(&client_id, &ProtocolError::Binary.to_string());
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            },
            // Writer gone: socket write failed, timed out, or a close was sent.
            _ = &mut writer => break,
        }
    }

    registry.unregister_sink(&client_id, &sink);
    writer.abort();
}

/// Drain the client's sink channel into the socket.
async fn write_frames<S>(
    mut ws_tx: S,
    mut rx: mpsc::Receiver<OutboundFrame>,
    send_timeout: Duration,
    client_id: String,
) where
    S: futures_util::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(frame) = rx.recv().await {
        let (message, closing) = match frame {
            OutboundFrame::Text(text) => (Message::Text(text.into()), false),
            OutboundFrame::Close { code, reason } => (
                Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                })),
                true,
            ),
        };

        match tokio::time::timeout(send_timeout, ws_tx.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(client_id = %client_id, error = %e, "WebSocket write failed");
                return;
            }
            Err(_) => {
                tracing::warn!(
                    client_id = %client_id,
                    timeout_secs = send_timeout.as_secs(),
                    "WebSocket write timed out, dropping connection"
                );
                return;
            }
        }

        if closing {
            return;
        }
    }
}

fn handle_text(registry: &ClientRegistry, client_id: &str, text: &str) {
    match parse_client_message(text) {
        Ok(ClientMessage::Subscribe { tags }) => {
            for tag in &tags {
                registry.add_tag(client_id, tag);
            }
            send_subscriptions(registry, client_id);
        }
        Ok(ClientMessage::Unsubscribe { tags }) => {
            for tag in &tags {
                registry.remove_tag(client_id, tag);
            }
            send_subscriptions(registry, client_id);
        }
        Ok(ClientMessage::Ping) => {
            registry.send(client_id, &Payload::Pong(Pong { timestamp: now_millis() }));
        }
        Err(e) => {
            tracing::debug!(client_id = %client_id, error = %e, "Rejected client message");
            registry.send_error(client_id, &e.to_string());
        }
    }
}

fn send_subscriptions(registry: &ClientRegistry, client_id: &str) {
    let tags = registry.tags(client_id).unwrap_or_default();
    registry.send(client_id, &Payload::Subscribed(Subscribed { tags }));
}
