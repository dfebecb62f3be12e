//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use kodou_shared::protocol::Event;
use kodou_shared::time::epoch_millis;

use crate::{relay, router, state::AppState};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Create a channel for this connection to receive broadcasts
    let (tx, mut rx) = mpsc::unbounded_channel();

    let conn_id = {
        let mut registry = state.registry.lock().await;
        let conn_id = registry.add(tx, epoch_millis());
        tracing::info!("Connection {} opened, total: {}", conn_id, registry.count());

        // Notify every viewer (the new one included) of the new count
        relay::broadcast(&registry, &Event::connect(registry.count(), epoch_millis()));
        conn_id
    };

    let (mut sender, mut receiver) = socket.split();

    let state_clone = state.clone();

    // Receive messages from this connection and route them
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error on connection {}: {}", conn_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    if let Err(e) = router::route(&state_clone, conn_id, &text).await {
                        // A bad message never takes the connection down
                        tracing::warn!("Dropping message from connection {}: {}", conn_id, e);
                    }
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping from connection {}", conn_id);
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Connection {} requested close", conn_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Drain this connection's channel into its socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Remove the connection and tell the remaining viewers the new count
    {
        let mut registry = state.registry.lock().await;
        registry.remove(conn_id);
        tracing::info!("Connection {} closed, total: {}", conn_id, registry.count());
        relay::broadcast(
            &registry,
            &Event::disconnect(registry.count(), epoch_millis()),
        );
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
