use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::api::ws_types::WsMessage;
use crate::ingestion::IngestorState;
use crate::AppState;

/// POST /api/control/start: Start the event ingestor.
pub async fn start(State(state): State<AppState>) -> Json<Value> {
    let ingestor = state.service.ingestor();
    let changed = ingestor.start();
    if changed {
        tracing::info!("Event ingestor STARTED via control API");
        let _ = state.ws_tx.send(WsMessage::IngestorState(IngestorState::Running));
    }
    Json(json!({ "status": ingestor.state(), "changed": changed }))
}

/// POST /api/control/stop: Stop the event ingestor after the current tick.
pub async fn stop(State(state): State<AppState>) -> Json<Value> {
    let ingestor = state.service.ingestor();
    let changed = ingestor.stop().await;
    if changed {
        tracing::warn!("Event ingestor STOPPED via control API");
        let _ = state.ws_tx.send(WsMessage::IngestorState(IngestorState::Stopped));
    }
    Json(json!({ "status": ingestor.state(), "changed": changed }))
}

/// GET /api/control/status: Current system status.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let mode = if state.config.live_trading() { "live" } else { "dry_run" };
    let registry = state.service.registry();

    let subscriptions: Vec<Value> = state
        .service
        .ingestor()
        .subscriptions()
        .into_iter()
        .map(|(market, makers)| json!({ "market": market, "makers": makers }))
        .collect();

    Json(json!({
        "mode": mode,
        "ingestor": state.service.ingestor().state(),
        "positions": registry.len(),
        "buckets": registry.tracked_pairs().len(),
        "subscriptions": subscriptions,
    }))
}
