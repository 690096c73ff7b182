use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::api::ws_types::WsMessage;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StreamFilter {
    /// Only forward results and alerts for this position.
    pub position_id: Option<String>,
}

impl StreamFilter {
    fn admits(&self, msg: &WsMessage) -> bool {
        let Some(wanted) = self.position_id.as_deref() else {
            return true;
        };
        match msg {
            WsMessage::MirrorResult(r) => r.position_id == wanted,
            WsMessage::RiskAlert(a) => a.position_id() == wanted,
            WsMessage::IngestorState(_) => true,
        }
    }
}

pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(filter): Query<StreamFilter>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_results(socket, state, filter))
}

async fn stream_results(mut socket: WebSocket, state: AppState, filter: StreamFilter) {
    tracing::info!(position_id = ?filter.position_id, "Result stream client connected");

    let mut rx = state.ws_tx.subscribe();

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Ok(msg) if filter.admits(&msg) => {
                    let json = match serde_json::to_string(&msg) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize WsMessage");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Result stream client lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("Result stream client disconnected");
}
