use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::models::MirrorExecutionResult;

/// Stored mirror result as served by the API.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredResult {
    pub id: i64,
    pub position_id: String,
    pub source_order_id: String,
    pub mirrored_order_id: Option<String>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub side: String,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub external_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_result(pool: &PgPool, result: &MirrorExecutionResult) -> anyhow::Result<i64> {
    let mirrored = (!result.mirrored_order_id.is_empty()).then_some(result.mirrored_order_id.as_str());

    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO mirror_results
            (position_id, source_order_id, mirrored_order_id, price, quantity, side,
             success, failure_reason, external_reference)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(&result.position_id)
    .bind(&result.source_order_id)
    .bind(mirrored)
    .bind(result.price)
    .bind(result.quantity)
    .bind(result.side.as_str())
    .bind(result.success)
    .bind(&result.failure_reason)
    .bind(&result.external_reference)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Successful mirror orders placed today for one of `owner`'s positions.
pub async fn count_today_for_position(pool: &PgPool, owner: &str, position_id: &str) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM mirror_results r
        JOIN tracked_positions p ON p.position_id = r.position_id
        WHERE p.owner = $1
          AND r.position_id = $2
          AND r.success
          AND r.created_at >= CURRENT_DATE
        "#,
    )
    .bind(owner)
    .bind(position_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Most recent results for a position, newest first.
pub async fn recent_for_position(
    pool: &PgPool,
    position_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<StoredResult>> {
    let rows = sqlx::query_as::<_, StoredResult>(
        r#"
        SELECT * FROM mirror_results
        WHERE position_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(position_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
