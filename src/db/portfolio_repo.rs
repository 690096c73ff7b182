use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::RiskSettings;
use crate::ports::OrderStats;

#[derive(Debug, Clone, sqlx::FromRow)]
struct RiskSettingsRow {
    max_order_value: Decimal,
    stop_loss_percent: Decimal,
    take_profit_percent: Decimal,
    daily_trade_limit: i32,
    max_open_positions: i32,
    auto_pause_on_loss: bool,
    min_balance_threshold: Decimal,
}

impl From<RiskSettingsRow> for RiskSettings {
    fn from(row: RiskSettingsRow) -> Self {
        RiskSettings {
            max_order_value: row.max_order_value,
            stop_loss_percent: row.stop_loss_percent,
            take_profit_percent: row.take_profit_percent,
            daily_trade_limit: row.daily_trade_limit.max(0) as u32,
            max_open_positions: row.max_open_positions.max(0) as u32,
            auto_pause_on_loss: row.auto_pause_on_loss,
            min_balance_threshold: row.min_balance_threshold,
        }
    }
}

pub async fn get_risk_settings(pool: &PgPool, owner: &str) -> anyhow::Result<Option<RiskSettings>> {
    let row = sqlx::query_as::<_, RiskSettingsRow>(
        r#"
        SELECT max_order_value, stop_loss_percent, take_profit_percent, daily_trade_limit,
               max_open_positions, auto_pause_on_loss, min_balance_threshold
        FROM risk_settings
        WHERE owner = $1
        "#,
    )
    .bind(owner)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(RiskSettings::from))
}

pub async fn upsert_risk_settings(pool: &PgPool, owner: &str, s: &RiskSettings) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO risk_settings
            (owner, max_order_value, stop_loss_percent, take_profit_percent, daily_trade_limit,
             max_open_positions, auto_pause_on_loss, min_balance_threshold, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT (owner) DO UPDATE SET
            max_order_value = $2,
            stop_loss_percent = $3,
            take_profit_percent = $4,
            daily_trade_limit = $5,
            max_open_positions = $6,
            auto_pause_on_loss = $7,
            min_balance_threshold = $8,
            updated_at = NOW()
        "#,
    )
    .bind(owner)
    .bind(s.max_order_value)
    .bind(s.stop_loss_percent)
    .bind(s.take_profit_percent)
    .bind(s.daily_trade_limit as i32)
    .bind(s.max_open_positions as i32)
    .bind(s.auto_pause_on_loss)
    .bind(s.min_balance_threshold)
    .execute(pool)
    .await?;

    Ok(())
}

/// Realized P&L percent; zero when nothing has settled yet.
pub async fn get_realized_pnl_percent(pool: &PgPool, position_id: &str) -> anyhow::Result<Decimal> {
    let row: Option<(Decimal,)> = sqlx::query_as(
        "SELECT realized_pnl_percent FROM position_performance WHERE position_id = $1",
    )
    .bind(position_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.0).unwrap_or(Decimal::ZERO))
}

pub async fn get_order_stats(pool: &PgPool, position_id: &str) -> anyhow::Result<OrderStats> {
    let row: Option<(i32, i32)> = sqlx::query_as(
        "SELECT completed_orders, winning_orders FROM position_performance WHERE position_id = $1",
    )
    .bind(position_id)
    .fetch_optional(pool)
    .await?;

    Ok(row
        .map(|(completed, wins)| OrderStats {
            completed: completed.max(0) as u32,
            wins: wins.max(0) as u32,
        })
        .unwrap_or_default())
}
