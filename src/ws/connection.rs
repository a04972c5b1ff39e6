//! WebSocket connection loop.
//!
//! Registers the socket with the [`RelayHub`], then multiplexes inbound
//! client frames with the session's outbound queue until either side
//! closes. Every exit path ends in exactly one `disconnect`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::messages::{ClientCommand, Frame};
use crate::domain::{RelayHub, SessionId};
use crate::error::RelayError;

/// Why a connection loop ended. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    ClientClosed,
    ReadError,
    WriteError,
    OutboxClosed,
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads client frames and dispatches `send_piine` to the hub.
/// - Forwards the session's queued events to the client.
pub async fn run_connection(socket: WebSocket, hub: Arc<RelayHub>) {
    let (id, mut outbox) = hub.connect().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let reason = loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(err) = handle_text_message(&hub, id, text.as_str()).await {
                            tracing::debug!(session_id = %id, error = %err, "ignored client frame");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break CloseReason::ClientClosed,
                    Some(Err(err)) => {
                        tracing::debug!(session_id = %id, error = %err, "ws read failed");
                        break CloseReason::ReadError;
                    }
                    _ => {}
                }
            }
            // Event queued by the hub
            event = outbox.recv() => {
                let Some(event) = event else {
                    break CloseReason::OutboxClosed;
                };
                match Frame::from(event).to_json() {
                    Ok(json) => {
                        // Client frames are not read while this write is
                        // pending. A peer whose TCP window stays full holds
                        // the loop here and its session stays registered
                        // until the transport errors out.
                        if let Err(err) = ws_tx.send(Message::text(json)).await {
                            tracing::debug!(session_id = %id, error = %err, "ws write failed");
                            break CloseReason::WriteError;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(session_id = %id, error = %err, "failed to encode event");
                    }
                }
            }
        }
    };

    if let Err(err) = hub.disconnect(id).await {
        tracing::debug!(session_id = %id, error = %err, "session already removed");
    }
    tracing::debug!(session_id = %id, reason = ?reason, "ws connection closed");
}

/// Dispatches one client text frame.
async fn handle_text_message(
    hub: &RelayHub,
    id: SessionId,
    text: &str,
) -> Result<(), RelayError> {
    match ClientCommand::parse(text)? {
        ClientCommand::SendPiine => {
            hub.ping(id).await?;
        }
    }
    Ok(())
}
