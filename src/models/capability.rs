use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bounded, revocable authority granted by a follower to the mirroring
/// operator for one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub id: String,
    pub position_id: String,
    pub grantor_owner: String,
    pub operator_identity: String,
    /// Maximum order value the operator may submit; zero means unlimited.
    pub max_order_size: Decimal,
    /// Epoch milliseconds; zero means no expiry.
    pub expires_at: i64,
    pub active: bool,
}

impl Capability {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at != 0 && now_ms > self.expires_at
    }

    pub fn exceeds_limit(&self, order_value: Decimal) -> bool {
        !self.max_order_size.is_zero() && order_value > self.max_order_size
    }
}
