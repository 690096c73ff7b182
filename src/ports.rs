//! Narrow interfaces to the collaborators the mirror core depends on.
//!
//! The core never talks to a venue, database or chat transport directly; it
//! is wired against these traits at startup so tests can swap in fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Capability, MirrorExecutionResult, RiskSettings, Side, TrackedPosition};

// ---------------------------------------------------------------------------
// Venue query
// ---------------------------------------------------------------------------

/// One venue activity record as returned by the upstream API, before
/// normalization. Every field is optional because venues are sloppy.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawActivityRecord {
    #[serde(default, alias = "order_id")]
    pub id: Option<String>,
    #[serde(default, alias = "maker_address")]
    pub maker: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, alias = "size")]
    pub quantity: Option<Decimal>,
    /// Seconds, milliseconds, a numeric string or RFC 3339.
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
}

#[async_trait]
pub trait VenueQuery: Send + Sync {
    /// Recent activity on `market` since `since`, in venue order.
    /// Idempotent and side-effect-free.
    async fn query_recent_activity(
        &self,
        market: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<RawActivityRecord>>;
}

// ---------------------------------------------------------------------------
// Order execution
// ---------------------------------------------------------------------------

/// Classified submission failure. Only transient errors are retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("rejected by venue: {0}")]
    Rejected(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid order: {0}")]
    Invalid(String),
}

impl ExecutionError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExecutionError::Timeout(_) | ExecutionError::Network(_) | ExecutionError::RateLimited(_)
        )
    }
}

/// A scaled order ready for submission on a follower's account.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledOrder {
    pub execution_account_key: String,
    pub market: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub side: Side,
    /// Idempotency key; fresh for every attempt.
    pub client_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: String,
    pub external_reference: Option<String>,
}

#[async_trait]
pub trait OrderExecution: Send + Sync {
    async fn submit_scaled_order(&self, order: &ScaledOrder) -> Result<OrderAck, ExecutionError>;
}

// ---------------------------------------------------------------------------
// Balance / portfolio
// ---------------------------------------------------------------------------

/// Completed-order counts used by the auto-pause rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderStats {
    pub completed: u32,
    pub wins: u32,
}

impl OrderStats {
    /// Win rate in percent, `None` when nothing has completed yet.
    pub fn win_rate_percent(&self) -> Option<Decimal> {
        if self.completed == 0 {
            return None;
        }
        Some(Decimal::from(self.wins) * Decimal::ONE_HUNDRED / Decimal::from(self.completed))
    }
}

/// Read-only portfolio aggregates used exclusively by the risk gate.
#[async_trait]
pub trait PortfolioReader: Send + Sync {
    async fn risk_settings(&self, owner: &str) -> anyhow::Result<Option<RiskSettings>>;
    async fn available_balance(&self, owner: &str) -> anyhow::Result<Decimal>;
    async fn realized_pnl_percent(&self, position_id: &str) -> anyhow::Result<Decimal>;
    async fn today_trade_count(&self, owner: &str, position_id: &str) -> anyhow::Result<u32>;
    async fn active_position_count(&self, owner: &str) -> anyhow::Result<u32>;
    async fn order_stats(&self, position_id: &str) -> anyhow::Result<OrderStats>;
}

// ---------------------------------------------------------------------------
// Result sink
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, result: &MirrorExecutionResult) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Read access to capability records; issuance and revocation live elsewhere.
#[async_trait]
pub trait CapabilityStore: Send + Sync {
    async fn get_capability(&self, capability_id: &str) -> anyhow::Result<Option<Capability>>;
}

// ---------------------------------------------------------------------------
// Durable positions
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn load_all_active_positions(&self) -> anyhow::Result<Vec<TrackedPosition>>;
    async fn deactivate_position(&self, position_id: &str, reason: &str) -> anyhow::Result<()>;
    /// Insert or replace the durable copy of a position.
    async fn save_position(&self, position: &TrackedPosition) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiskAlert {
    StopLoss {
        position_id: String,
        owner: String,
        pnl_percent: Decimal,
    },
    TakeProfit {
        position_id: String,
        owner: String,
        pnl_percent: Decimal,
    },
    AutoPaused {
        position_id: String,
        owner: String,
        win_rate_percent: Decimal,
    },
}

impl RiskAlert {
    pub fn position_id(&self) -> &str {
        match self {
            RiskAlert::StopLoss { position_id, .. }
            | RiskAlert::TakeProfit { position_id, .. }
            | RiskAlert::AutoPaused { position_id, .. } => position_id,
        }
    }
}

/// Delivery is best effort; implementations log their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_result(&self, result: &MirrorExecutionResult);
    async fn notify_risk(&self, alert: &RiskAlert);
}
