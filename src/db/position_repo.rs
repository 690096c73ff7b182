use sqlx::PgPool;

use crate::models::{Ratio, TrackedPosition};

#[derive(Debug, Clone, sqlx::FromRow)]
struct PositionRow {
    position_id: String,
    owner: String,
    target_maker: String,
    market_key: String,
    ratio: i16,
    active: bool,
    execution_account_key: String,
    capability_id: Option<String>,
}

impl TryFrom<PositionRow> for TrackedPosition {
    type Error = crate::models::InvalidRatio;

    fn try_from(row: PositionRow) -> Result<Self, Self::Error> {
        Ok(TrackedPosition {
            position_id: row.position_id,
            owner: row.owner,
            target_maker: row.target_maker,
            market_key: row.market_key,
            ratio: Ratio::new(row.ratio as i64)?,
            active: row.active,
            execution_account_key: row.execution_account_key,
            capability_id: row.capability_id,
        })
    }
}

const POSITION_COLUMNS: &str = "position_id, owner, target_maker, market_key, ratio, active, \
                                execution_account_key, capability_id";

/// All active positions. Rows with an out-of-range ratio are skipped
/// with a warning rather than failing the whole load.
pub async fn load_active(pool: &PgPool) -> anyhow::Result<Vec<TrackedPosition>> {
    let rows = sqlx::query_as::<_, PositionRow>(&format!(
        "SELECT {POSITION_COLUMNS} FROM tracked_positions WHERE active ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await?;

    let mut positions = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.position_id.clone();
        match TrackedPosition::try_from(row) {
            Ok(p) => positions.push(p),
            Err(e) => tracing::warn!(position_id = %id, error = %e, "Skipping stored position"),
        }
    }
    Ok(positions)
}

pub async fn get_position(pool: &PgPool, position_id: &str) -> anyhow::Result<Option<TrackedPosition>> {
    let row = sqlx::query_as::<_, PositionRow>(&format!(
        "SELECT {POSITION_COLUMNS} FROM tracked_positions WHERE position_id = $1"
    ))
    .bind(position_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(TrackedPosition::try_from).transpose()?)
}

/// Insert or fully replace a position row. Re-activating clears any
/// previous deactivation reason.
pub async fn upsert_position(pool: &PgPool, position: &TrackedPosition) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tracked_positions
            (position_id, owner, target_maker, market_key, ratio, active,
             execution_account_key, capability_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (position_id) DO UPDATE SET
            owner = $2,
            target_maker = $3,
            market_key = $4,
            ratio = $5,
            active = $6,
            execution_account_key = $7,
            capability_id = $8,
            deactivated_reason = CASE WHEN $6 THEN NULL ELSE tracked_positions.deactivated_reason END,
            updated_at = NOW()
        "#,
    )
    .bind(&position.position_id)
    .bind(&position.owner)
    .bind(&position.target_maker)
    .bind(&position.market_key)
    .bind(position.ratio.get() as i16)
    .bind(position.active)
    .bind(&position.execution_account_key)
    .bind(&position.capability_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a position inactive. Returns false when no row matched.
pub async fn deactivate(pool: &PgPool, position_id: &str, reason: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tracked_positions
        SET active = FALSE, deactivated_reason = $2, updated_at = NOW()
        WHERE position_id = $1
        "#,
    )
    .bind(position_id)
    .bind(reason)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Count of an owner's active positions.
pub async fn count_active_for_owner(pool: &PgPool, owner: &str) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM tracked_positions WHERE owner = $1 AND active",
    )
    .bind(owner)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}
