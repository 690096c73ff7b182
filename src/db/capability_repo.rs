use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::Capability;

#[derive(Debug, Clone, sqlx::FromRow)]
struct CapabilityRow {
    id: String,
    position_id: String,
    grantor_owner: String,
    operator_identity: String,
    max_order_size: Decimal,
    expires_at: i64,
    active: bool,
}

impl From<CapabilityRow> for Capability {
    fn from(row: CapabilityRow) -> Self {
        Capability {
            id: row.id,
            position_id: row.position_id,
            grantor_owner: row.grantor_owner,
            operator_identity: row.operator_identity,
            max_order_size: row.max_order_size,
            expires_at: row.expires_at,
            active: row.active,
        }
    }
}

pub async fn get_capability(pool: &PgPool, id: &str) -> anyhow::Result<Option<Capability>> {
    let row = sqlx::query_as::<_, CapabilityRow>(
        r#"
        SELECT id, position_id, grantor_owner, operator_identity, max_order_size, expires_at, active
        FROM capabilities
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Capability::from))
}

/// Test and tooling helper; issuance normally happens outside this service.
pub async fn insert_capability(pool: &PgPool, cap: &Capability) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO capabilities
            (id, position_id, grantor_owner, operator_identity, max_order_size, expires_at, active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            max_order_size = $5, expires_at = $6, active = $7
        "#,
    )
    .bind(&cap.id)
    .bind(&cap.position_id)
    .bind(&cap.grantor_owner)
    .bind(&cap.operator_identity)
    .bind(cap.max_order_size)
    .bind(cap.expires_at)
    .bind(cap.active)
    .execute(pool)
    .await?;

    Ok(())
}
