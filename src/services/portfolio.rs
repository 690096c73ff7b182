use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::db::{portfolio_repo, position_repo, result_repo};
use crate::models::RiskSettings;
use crate::ports::{OrderStats, PortfolioReader};
use crate::venue::VenueClient;

/// Portfolio aggregates for the risk gate: balances come from the venue,
/// everything else from stored results and settled performance.
#[derive(Debug, Clone)]
pub struct PortfolioView {
    pool: PgPool,
    venue: VenueClient,
}

impl PortfolioView {
    pub fn new(pool: PgPool, venue: VenueClient) -> Self {
        Self { pool, venue }
    }
}

#[async_trait]
impl PortfolioReader for PortfolioView {
    async fn risk_settings(&self, owner: &str) -> anyhow::Result<Option<RiskSettings>> {
        portfolio_repo::get_risk_settings(&self.pool, owner).await
    }

    async fn available_balance(&self, owner: &str) -> anyhow::Result<Decimal> {
        Ok(self.venue.get_balance(owner).await?)
    }

    async fn realized_pnl_percent(&self, position_id: &str) -> anyhow::Result<Decimal> {
        portfolio_repo::get_realized_pnl_percent(&self.pool, position_id).await
    }

    async fn today_trade_count(&self, owner: &str, position_id: &str) -> anyhow::Result<u32> {
        let n = result_repo::count_today_for_position(&self.pool, owner, position_id).await?;
        Ok(u32::try_from(n).unwrap_or(u32::MAX))
    }

    async fn active_position_count(&self, owner: &str) -> anyhow::Result<u32> {
        let n = position_repo::count_active_for_owner(&self.pool, owner).await?;
        Ok(u32::try_from(n).unwrap_or(u32::MAX))
    }

    async fn order_stats(&self, position_id: &str) -> anyhow::Result<OrderStats> {
        portfolio_repo::get_order_stats(&self.pool, position_id).await
    }
}
