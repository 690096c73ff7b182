use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{Capability, TrackedPosition};
use crate::ports::CapabilityStore;

/// How orders for a position are authorized. Resolved once per position per
/// dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionMode {
    /// The follower's own credentials are used directly.
    Custodial,
    /// The operator acts under a bounded grant.
    Delegated(Capability),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Authorized,
    Denied(DenialReason),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DenialReason {
    #[error("capability inactive")]
    Inactive,

    #[error("capability expired")]
    Expired,

    #[error("exceeds delegated limit")]
    ExceedsLimit,

    #[error("capability not found")]
    NotFound,

    #[error("capability bound to another position")]
    WrongPosition,

    #[error("capability lookup failed: {0}")]
    LookupFailed(String),
}

impl ExecutionMode {
    pub fn authorize(&self, position_id: &str, order_value: Decimal, now: DateTime<Utc>) -> Authorization {
        let cap = match self {
            ExecutionMode::Custodial => return Authorization::Authorized,
            ExecutionMode::Delegated(cap) => cap,
        };

        if cap.position_id != position_id {
            return Authorization::Denied(DenialReason::WrongPosition);
        }
        if !cap.active {
            return Authorization::Denied(DenialReason::Inactive);
        }
        if cap.is_expired(now.timestamp_millis()) {
            return Authorization::Denied(DenialReason::Expired);
        }
        if cap.exceeds_limit(order_value) {
            return Authorization::Denied(DenialReason::ExceedsLimit);
        }
        Authorization::Authorized
    }
}

/// Answers "may the operator act for this position, up to this value?".
///
/// A position that names a capability never falls back to custodial
/// execution: a missing record or failed lookup is a denial.
#[derive(Clone)]
pub struct CapabilityModel {
    store: Arc<dyn CapabilityStore>,
    lookup_timeout: Duration,
}

impl CapabilityModel {
    pub fn new(store: Arc<dyn CapabilityStore>, lookup_timeout: Duration) -> Self {
        Self {
            store,
            lookup_timeout,
        }
    }

    pub async fn resolve_mode(&self, position: &TrackedPosition) -> Result<ExecutionMode, DenialReason> {
        let Some(cap_id) = position.capability_id.as_deref() else {
            return Ok(ExecutionMode::Custodial);
        };

        let lookup = tokio::time::timeout(self.lookup_timeout, self.store.get_capability(cap_id)).await;
        match lookup {
            Ok(Ok(Some(cap))) => Ok(ExecutionMode::Delegated(cap)),
            Ok(Ok(None)) => Err(DenialReason::NotFound),
            Ok(Err(e)) => Err(DenialReason::LookupFailed(e.to_string())),
            Err(_) => Err(DenialReason::LookupFailed("timeout".into())),
        }
    }

    pub async fn authorize(
        &self,
        position: &TrackedPosition,
        order_value: Decimal,
        now: DateTime<Utc>,
    ) -> Authorization {
        match self.resolve_mode(position).await {
            Ok(mode) => mode.authorize(&position.position_id, order_value, now),
            Err(reason) => Authorization::Denied(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
