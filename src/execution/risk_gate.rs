use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{RiskSettings, TrackedPosition};
use crate::ports::{PortfolioReader, RiskAlert};

/// Completed orders required before the win-rate auto-pause can fire.
const AUTO_PAUSE_MIN_ORDERS: u32 = 5;

/// Win rate (percent) below which auto-pause deactivates a position.
const AUTO_PAUSE_WIN_RATE_PCT: i64 = 30;

/// Gate-level configuration, independent of per-follower settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskGateConfig {
    /// Allow the trade when the balance collaborator cannot answer.
    pub fail_open_on_balance_error: bool,
    pub lookup_timeout: Duration,
}

impl Default for RiskGateConfig {
    fn default() -> Self {
        Self {
            fail_open_on_balance_error: true,
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

/// Pre-trade check violation. Display strings lead with the short reason.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RiskViolation {
    #[error("max order size: order value {value} exceeds {max}")]
    MaxOrderSize { value: Decimal, max: Decimal },

    #[error("daily limit: {count}/{limit} orders today")]
    DailyLimit { count: u32, limit: u32 },

    #[error("max positions: {current} active, max {max}")]
    MaxPositions { current: u32, max: u32 },

    #[error("low balance: {available} below threshold {threshold}")]
    LowBalance { available: Decimal, threshold: Decimal },

    #[error("low balance: balance unavailable ({0})")]
    BalanceUnavailable(String),
}

/// Pre-trade and post-trade policy evaluator. Holds no state across calls;
/// all aggregates are read from the portfolio collaborator.
#[derive(Clone)]
pub struct RiskGate {
    portfolio: Arc<dyn PortfolioReader>,
    config: RiskGateConfig,
}

impl RiskGate {
    pub fn new(portfolio: Arc<dyn PortfolioReader>, config: RiskGateConfig) -> Self {
        Self { portfolio, config }
    }

    pub async fn settings_for(&self, owner: &str) -> RiskSettings {
        match self.bounded(self.portfolio.risk_settings(owner)).await {
            Ok(Some(settings)) => settings.sanitized(),
            Ok(None) => RiskSettings::default(),
            Err(e) => {
                tracing::warn!(owner, error = %e, "Risk settings unavailable, using defaults");
                RiskSettings::default()
            }
        }
    }

    /// Run the four pre-trade checks in order; the first failure wins.
    pub async fn pre_trade(
        &self,
        owner: &str,
        position: &TrackedPosition,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<(), RiskViolation> {
        let settings = self.settings_for(owner).await;

        // 1. Order value cap
        let value = quantity * price;
        if !settings.max_order_value.is_zero() && value > settings.max_order_value {
            return Err(RiskViolation::MaxOrderSize {
                value,
                max: settings.max_order_value,
            });
        }

        // 2. Daily trade count for this position
        if settings.daily_trade_limit > 0 {
            let count = self
                .bounded(self.portfolio.today_trade_count(owner, &position.position_id))
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(owner, error = %e, "Today trade count unavailable, assuming 0");
                    0
                });
            if count >= settings.daily_trade_limit {
                return Err(RiskViolation::DailyLimit {
                    count,
                    limit: settings.daily_trade_limit,
                });
            }
        }

        // 3. Portfolio-wide open position circuit breaker
        if settings.max_open_positions > 0 {
            let current = self
                .bounded(self.portfolio.active_position_count(owner))
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(owner, error = %e, "Active position count unavailable, assuming 0");
                    0
                });
            if current > settings.max_open_positions {
                return Err(RiskViolation::MaxPositions {
                    current,
                    max: settings.max_open_positions,
                });
            }
        }

        // 4. Minimum balance
        match self.bounded(self.portfolio.available_balance(owner)).await {
            Ok(available) if available < settings.min_balance_threshold => {
                return Err(RiskViolation::LowBalance {
                    available,
                    threshold: settings.min_balance_threshold,
                });
            }
            Ok(_) => {}
            Err(e) if self.config.fail_open_on_balance_error => {
                tracing::warn!(owner, error = %e, "Balance unavailable, failing open");
            }
            Err(e) => return Err(RiskViolation::BalanceUnavailable(e.to_string())),
        }

        Ok(())
    }

    /// Evaluate stop-loss, take-profit and auto-pause after a successful
    /// execution. Returned alerts with `deactivates()` require the caller to
    /// retire the position.
    pub async fn post_trade(&self, position: &TrackedPosition) -> Vec<RiskAlert> {
        let settings = self.settings_for(&position.owner).await;
        let mut alerts = Vec::new();

        match self
            .bounded(self.portfolio.realized_pnl_percent(&position.position_id))
            .await
        {
            Ok(pnl) => {
                if settings.stop_loss_percent > Decimal::ZERO && pnl <= -settings.stop_loss_percent {
                    alerts.push(RiskAlert::StopLoss {
                        position_id: position.position_id.clone(),
                        owner: position.owner.clone(),
                        pnl_percent: pnl,
                    });
                    return alerts;
                }
                if settings.take_profit_percent > Decimal::ZERO && pnl >= settings.take_profit_percent {
                    alerts.push(RiskAlert::TakeProfit {
                        position_id: position.position_id.clone(),
                        owner: position.owner.clone(),
                        pnl_percent: pnl,
                    });
                }
            }
            Err(e) => {
                tracing::warn!(
                    position_id = %position.position_id,
                    error = %e,
                    "Realized P&L unavailable, skipping SL/TP review"
                );
            }
        }

        if settings.auto_pause_on_loss {
            match self.bounded(self.portfolio.order_stats(&position.position_id)).await {
                Ok(stats) if stats.completed >= AUTO_PAUSE_MIN_ORDERS => {
                    if let Some(win_rate) = stats.win_rate_percent() {
                        if win_rate < Decimal::from(AUTO_PAUSE_WIN_RATE_PCT) {
                            alerts.push(RiskAlert::AutoPaused {
                                position_id: position.position_id.clone(),
                                owner: position.owner.clone(),
                                win_rate_percent: win_rate,
                            });
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        position_id = %position.position_id,
                        error = %e,
                        "Order stats unavailable, skipping auto-pause review"
                    );
                }
            }
        }

        alerts
    }

    async fn bounded<T, F>(&self, fut: F) -> anyhow::Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        tokio::time::timeout(self.config.lookup_timeout, fut)
            .await
            .map_err(|_| anyhow::anyhow!("portfolio lookup timed out"))?
    }
}

impl RiskAlert {
    /// Stop-loss and auto-pause retire the position; take-profit only notifies.
    pub fn deactivates(&self) -> bool {
        matches!(self, RiskAlert::StopLoss { .. } | RiskAlert::AutoPaused { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
