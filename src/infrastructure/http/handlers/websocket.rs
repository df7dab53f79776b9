//! WebSocket Handler - 缓存控制通道

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::infrastructure::http::state::AppState;

pub async fn cache_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_cache_socket(socket, state))
}

async fn handle_cache_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (client_id, mut outbound) = state.broker.register();

    // 出站消息转发任务
    let forward_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let msg = match serde_json::to_string(&message) {
                Ok(json) => Message::Text(json),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize cache message");
                    continue;
                }
            };

            if let Err(e) = sender.send(msg).await {
                tracing::debug!(client_id = %client_id, error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    // 入站消息分发
    let broker = state.broker.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => broker.dispatch_text(client_id, &text),
                Ok(Message::Close(_)) => {
                    tracing::info!(client_id = %client_id, "WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(client_id = %client_id, error = %e, "WebSocket error");
                    break;
                }
                // Ping/Pong 帧由 axum 处理
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = forward_task => {}
        _ = receive_task => {}
    }

    state.broker.unregister(client_id);
}
