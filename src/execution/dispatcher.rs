use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::{MakerOrderEvent, MirrorExecutionResult, TrackedPosition};
use crate::ports::{Notifier, PositionSource, ResultSink, RiskAlert, ScaledOrder};

use super::capability::{Authorization, CapabilityModel, DenialReason};
use super::order_executor::OrderExecutor;
use super::position_sizer::scale_quantity;
use super::registry::PositionRegistry;
use super::risk_gate::{RiskGate, RiskViolation};

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Positions of one event mirrored concurrently. 1 = strictly sequential.
    pub concurrency: usize,
    /// Truncate scaled quantities to this many decimal places.
    pub quantity_decimal_places: Option<u32>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            quantity_decimal_places: None,
        }
    }
}

/// Terminal reason a mirror attempt produced no order.
#[derive(Debug, Error)]
pub enum MirrorFailure {
    #[error("non-positive scaled quantity")]
    NonPositiveQuantity,

    #[error(transparent)]
    Authorization(#[from] DenialReason),

    #[error(transparent)]
    Risk(#[from] RiskViolation),

    #[error("submission failed after {attempts} attempt(s): {error}")]
    Submission {
        attempts: u32,
        error: crate::ports::ExecutionError,
    },
}

/// Collaborators the dispatcher is wired with at startup.
pub struct DispatcherDeps {
    pub registry: PositionRegistry,
    pub capabilities: CapabilityModel,
    pub risk: RiskGate,
    pub executor: OrderExecutor,
    pub sink: Arc<dyn ResultSink>,
    pub positions: Arc<dyn PositionSource>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

/// For one maker event, mirrors the order onto every subscribed active
/// position and records exactly one result per attempted position.
///
/// Holds no durable state. A per-position async lock guarantees that two
/// dispatches never submit concurrently for the same position.
#[derive(Clone)]
pub struct MirrorDispatcher {
    deps: Arc<DispatcherDeps>,
    config: DispatcherConfig,
    locks: PositionLocks,
}

impl MirrorDispatcher {
    pub fn new(deps: DispatcherDeps, config: DispatcherConfig) -> Self {
        Self {
            deps: Arc::new(deps),
            config,
            locks: PositionLocks::default(),
        }
    }

    pub fn registry(&self) -> &PositionRegistry {
        &self.deps.registry
    }

    /// Mirror one event. Results are returned in registry order.
    pub async fn dispatch(&self, event: &MakerOrderEvent) -> Vec<MirrorExecutionResult> {
        let positions = self
            .deps
            .registry
            .find_by_maker(&event.maker_address, &event.market_key);
        if positions.is_empty() {
            return Vec::new();
        }

        let start = Instant::now();
        counter!("maker_events_total").increment(1);

        tracing::info!(
            maker = %event.maker_address,
            market = %event.market_key,
            source_order_id = %event.source_order_id,
            side = %event.side,
            quantity = %event.quantity,
            price = %event.price,
            positions = positions.len(),
            "Dispatching maker order"
        );

        let results: Vec<MirrorExecutionResult> = stream::iter(positions)
            .map(|position| self.mirror_position(event, position))
            .buffered(self.config.concurrency.max(1))
            .filter_map(|r| async move { r })
            .collect()
            .await;

        histogram!("dispatch_latency_seconds").record(start.elapsed().as_secs_f64());
        results
    }

    /// Full pipeline for one (event, position) pair. `None` means the
    /// position was inactive or gone and is skipped silently.
    async fn mirror_position(
        &self,
        event: &MakerOrderEvent,
        snapshot: TrackedPosition,
    ) -> Option<MirrorExecutionResult> {
        let _guard = self.locks.acquire(&snapshot.position_id).await;

        // Re-read under the lock so a deactivation or a move to another
        // bucket that landed while we waited takes effect now.
        let position = self.deps.registry.find_by_id(&snapshot.position_id)?;
        if position.target_maker != event.maker_address || position.market_key != event.market_key {
            tracing::debug!(
                position_id = %position.position_id,
                maker = %event.maker_address,
                market = %event.market_key,
                "Position moved to another bucket, skipping"
            );
            return None;
        }
        if !position.active {
            tracing::debug!(position_id = %position.position_id, "Position inactive, skipping");
            return None;
        }

        let scaled = scale_quantity(event.quantity, position.ratio, self.config.quantity_decimal_places);

        let result = match self.execute(event, &position, scaled).await {
            Ok(ack) => {
                counter!("mirror_orders_succeeded").increment(1);
                tracing::info!(
                    position_id = %position.position_id,
                    source_order_id = %event.source_order_id,
                    mirrored_order_id = %ack.order_id,
                    quantity = %scaled,
                    "Mirror order submitted"
                );
                MirrorExecutionResult::succeeded(
                    &position.position_id,
                    &event.source_order_id,
                    ack.order_id,
                    event.price,
                    scaled,
                    event.side,
                    ack.external_reference,
                )
            }
            Err(failure) => {
                counter!("mirror_orders_failed").increment(1);
                self.log_failure(event, &position, &failure);
                MirrorExecutionResult::failed(
                    &position.position_id,
                    &event.source_order_id,
                    event.price,
                    scaled,
                    event.side,
                    failure.to_string(),
                )
            }
        };

        counter!("mirror_results_total").increment(1);
        if let Err(e) = self.deps.sink.record(&result).await {
            tracing::error!(
                position_id = %result.position_id,
                source_order_id = %result.source_order_id,
                error = %e,
                "Failed to record mirror result"
            );
        }

        if result.success {
            self.review_after_trade(&position).await;
        }

        Some(result)
    }

    async fn execute(
        &self,
        event: &MakerOrderEvent,
        position: &TrackedPosition,
        scaled: Decimal,
    ) -> Result<crate::ports::OrderAck, MirrorFailure> {
        if scaled <= Decimal::ZERO {
            return Err(MirrorFailure::NonPositiveQuantity);
        }

        let order_value = scaled * event.price;
        if let Authorization::Denied(reason) = self
            .deps
            .capabilities
            .authorize(position, order_value, Utc::now())
            .await
        {
            counter!("capability_denials_total").increment(1);
            return Err(reason.into());
        }

        if let Err(violation) = self
            .deps
            .risk
            .pre_trade(&position.owner, position, scaled, event.price)
            .await
        {
            counter!("risk_denials_total").increment(1);
            return Err(violation.into());
        }

        let order = ScaledOrder {
            execution_account_key: position.execution_account_key.clone(),
            market: event.market_key.clone(),
            price: event.price,
            quantity: scaled,
            side: event.side,
            client_token: String::new(),
        };

        let submission = self.deps.executor.submit(&order).await;
        let attempts = submission.attempts;
        submission
            .outcome
            .map_err(|error| MirrorFailure::Submission { attempts, error })
    }

    async fn review_after_trade(&self, position: &TrackedPosition) {
        for alert in self.deps.risk.post_trade(position).await {
            if alert.deactivates() {
                self.retire(position, &alert).await;
            } else {
                tracing::info!(position_id = %position.position_id, alert = ?alert, "Risk threshold reached");
            }

            if let Some(n) = &self.deps.notifier {
                n.notify_risk(&alert).await;
            }
        }
    }

    /// One-way removal after stop-loss or auto-pause. Only an explicit
    /// re-registration brings the position back.
    async fn retire(&self, position: &TrackedPosition, alert: &RiskAlert) {
        let reason = match alert {
            RiskAlert::StopLoss { .. } => "stop_loss",
            RiskAlert::AutoPaused { .. } => "auto_pause",
            RiskAlert::TakeProfit { .. } => return,
        };

        self.deps.registry.unregister(&position.position_id);
        counter!("risk_deactivations_total").increment(1);

        tracing::warn!(
            position_id = %position.position_id,
            owner = %position.owner,
            reason,
            "Position deactivated by risk gate"
        );

        if let Err(e) = self
            .deps
            .positions
            .deactivate_position(&position.position_id, reason)
            .await
        {
            tracing::error!(
                position_id = %position.position_id,
                error = %e,
                "Failed to persist position deactivation"
            );
        }
    }

    fn log_failure(&self, event: &MakerOrderEvent, position: &TrackedPosition, failure: &MirrorFailure) {
        match failure {
            MirrorFailure::NonPositiveQuantity => tracing::error!(
                position_id = %position.position_id,
                source_order_id = %event.source_order_id,
                quantity = %event.quantity,
                ratio = %position.ratio,
                "Scaled quantity is not positive, upstream data inconsistent"
            ),
            other => tracing::warn!(
                position_id = %position.position_id,
                source_order_id = %event.source_order_id,
                reason = %other,
                "Mirror attempt failed"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-position serialization
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct PositionLocks {
    inner: Arc<parking_lot::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl PositionLocks {
    async fn acquire(&self, position_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock();
            // Drop locks nobody else holds or waits on.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(position_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
