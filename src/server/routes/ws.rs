//! WebSocket endpoint for the browser extension

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::server::session::RelaySession;
use crate::server::state::AppState;
use crate::server::types::ServerMessage;

/// Outbound messages buffered per connection
const OUTBOUND_BUFFER: usize = 64;

/// GET /ws - extension connection
pub async fn relay_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);

    let mut session = RelaySession::new(Arc::clone(&state.sequencer), tx);
    let session_id = session.id().to_string();
    tracing::info!("🔌 Extension connected: {}", session_id);

    // Drain the outbound channel into the socket
    let writer_id = session_id.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("[{}] Failed to serialize {}: {}", writer_id, message.kind(), e);
                    continue;
                }
            };
            tracing::debug!("[{}] Sending {}", writer_id, message.kind());
            if ws_sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Inbound frames are handled one at a time, settle delays included
    let reader_id = session_id.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(frame) = ws_receiver.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("[{}] Read error: {}", reader_id, e);
                    break;
                }
            };

            if let Err(e) = session.handle_text(&text).await {
                tracing::warn!("[{}] Message handling error: {}", reader_id, e);
                break;
            }
        }
    });

    // Whichever side finishes first ends the connection
    tokio::select! {
        _ = &mut write_task => read_task.abort(),
        _ = &mut read_task => write_task.abort(),
    }

    tracing::info!("🔌 Extension disconnected: {}", session_id);
}
