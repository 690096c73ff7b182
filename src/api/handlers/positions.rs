use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::result_repo::{self, StoredResult};
use crate::errors::AppError;
use crate::models::{Ratio, TrackedPosition};
use crate::AppState;

use super::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct CreatePositionRequest {
    #[serde(default)]
    pub position_id: Option<String>,
    pub owner: String,
    pub target_maker: String,
    pub market_key: String,
    pub ratio: i64,
    #[serde(default = "default_active")]
    pub active: bool,
    pub execution_account_key: String,
    #[serde(default)]
    pub capability_id: Option<String>,
}

fn default_active() -> bool {
    true
}

impl CreatePositionRequest {
    fn into_position(self) -> Result<TrackedPosition, AppError> {
        for (field, value) in [
            ("owner", &self.owner),
            ("target_maker", &self.target_maker),
            ("market_key", &self.market_key),
            ("execution_account_key", &self.execution_account_key),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::BadRequest(format!("{field} must not be empty")));
            }
        }

        Ok(TrackedPosition {
            position_id: self
                .position_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            owner: self.owner,
            target_maker: self.target_maker,
            market_key: self.market_key,
            ratio: Ratio::new(self.ratio)?,
            active: self.active,
            execution_account_key: self.execution_account_key,
            capability_id: self.capability_id.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// GET /api/positions: registry snapshot.
pub async fn list(State(state): State<AppState>) -> Json<ApiResponse<Vec<TrackedPosition>>> {
    let mut positions = state.service.registry().all();
    positions.sort_by(|a, b| a.position_id.cmp(&b.position_id));
    Json(ApiResponse::ok(positions))
}

/// GET /api/positions/:id
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TrackedPosition>>, AppError> {
    state
        .service
        .registry()
        .find_by_id(&id)
        .map(|p| Json(ApiResponse::ok(p)))
        .ok_or_else(|| AppError::NotFound(format!("position {id}")))
}

/// POST /api/positions: register or replace a position.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreatePositionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TrackedPosition>>), AppError> {
    let position = req.into_position()?;
    state.service.open_position(position.clone()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(position))))
}

/// DELETE /api/positions/:id: idempotent unregister.
pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, AppError> {
    let removed = state.service.close_position(&id).await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    pub limit: Option<i64>,
}

/// GET /api/positions/:id/results: recent stored results, newest first.
pub async fn results(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ResultsQuery>,
) -> Result<Json<ApiResponse<Vec<StoredResult>>>, AppError> {
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let rows = result_repo::recent_for_position(&state.db, &id, limit).await?;
    Ok(Json(ApiResponse::ok(rows)))
}
