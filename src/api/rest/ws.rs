use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::state::AppState;

/// Live booking alerts for a signed-in admin tab.
pub async fn ws_handler(
    admin: AdminSession,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, admin))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, admin: AdminSession) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let mut alerts = BroadcastStream::new(state.alerts_tx.subscribe());

    info!(%connection_id, user_id = %admin.user.id, "alert socket connected");

    let send_task = tokio::spawn(async move {
        while let Some(next) = alerts.next().await {
            let alert = match next {
                Ok(alert) => alert,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(%connection_id, skipped, "alert socket lagged behind");
                    continue;
                }
            };

            let json = match serde_json::to_string(&alert) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize booking alert for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!(%connection_id, "alert socket disconnected");
}
