//! WebSocket receive loops

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::realtime_hub::{ConnectionId, Outbound, RealtimeHub};
use crate::state::AppState;
use crate::stream_protocol::{handle_inbound, handshake, Inbound, ProtocolError};
use crate::stream_session::{StreamMode, StreamSession};

impl From<Outbound> for Message {
    fn from(payload: Outbound) -> Self {
        match payload {
            Outbound::Text(text) => Message::Text(text),
            Outbound::Binary(bytes) => Message::Binary(bytes),
        }
    }
}

/// Plate gate stream upgrade handler
pub async fn gate_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let session = state.plate_session();
        handle_stream(socket, state, session)
    })
}

/// Lot capacity stream upgrade handler
pub async fn lot_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let session = state.capacity_session();
        handle_stream(socket, state, session)
    })
}

/// Signaling relay upgrade handler
pub async fn signaling_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_signaling(socket, state))
}

/// Register with a hub and spawn the task draining its queue into the socket
async fn attach(
    socket: WebSocket,
    hub: &RealtimeHub,
) -> (
    ConnectionId,
    futures::stream::SplitStream<WebSocket>,
    tokio::task::JoinHandle<()>,
) {
    let (mut sender, receiver) = socket.split();
    let (conn_id, mut rx) = hub.register().await;

    let send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sender.send(payload.into()).await.is_err() {
                break;
            }
        }
    });

    (conn_id, receiver, send_task)
}

/// Sequential receive -> process -> respond loop for one stream socket
async fn handle_stream<M: StreamMode + 'static>(
    socket: WebSocket,
    state: AppState,
    mut session: StreamSession<M>,
) {
    let hub: Arc<RealtimeHub> = state.stream_hub.clone();
    let (conn_id, mut receiver, send_task) = attach(socket, &hub).await;

    tracing::info!(connection_id = %conn_id, kind = session.kind(), "Stream session opened");

    match handshake(&state.config.summary()) {
        Ok(greeting) => {
            hub.send(&conn_id, greeting).await;
        }
        Err(e) => {
            tracing::warn!(connection_id = %conn_id, error = %e, "Failed to build handshake");
        }
    }

    while let Some(result) = receiver.next().await {
        let inbound = match result {
            Ok(Message::Text(text)) => Inbound::from_text(&text),
            Ok(Message::Binary(bytes)) => Inbound::from_binary(bytes),
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %conn_id, "Close frame received");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        };

        match handle_inbound(&mut session, inbound).await {
            Ok(Some(reply)) => {
                if !hub.send(&conn_id, reply).await {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(
                    connection_id = %conn_id,
                    frame_number = session.frame_count(),
                    error = %e,
                    "Stream loop failed"
                );
                if let Ok(reply) = Outbound::json(&ProtocolError::from_error(&e)) {
                    hub.send(&conn_id, reply).await;
                }
                break;
            }
        }
    }

    session.close();
    tracing::info!(
        connection_id = %conn_id,
        kind = session.kind(),
        total_frames = session.frame_count(),
        processed_frames = session.processed_count(),
        "Stream session closed"
    );

    // Dropping the hub's sender lets the send task flush and exit
    hub.unregister(&conn_id).await;
    let _ = send_task.await;
}

/// Relay every message verbatim to the other signaling peers
async fn handle_signaling(socket: WebSocket, state: AppState) {
    let hub: Arc<RealtimeHub> = state.signaling_hub.clone();
    let (conn_id, mut receiver, send_task) = attach(socket, &hub).await;

    while let Some(result) = receiver.next().await {
        let payload = match result {
            Ok(Message::Text(text)) => Outbound::Text(text),
            Ok(Message::Binary(bytes)) => Outbound::Binary(bytes),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        };
        hub.broadcast_except(&conn_id, payload).await;
    }

    hub.unregister(&conn_id).await;
    let _ = send_task.await;
}
