use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Side;

// ---------------------------------------------------------------------------
// MakerOrderEvent
// ---------------------------------------------------------------------------

/// A normalized observation of maker activity. Produced and consumed within
/// one dispatch cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakerOrderEvent {
    pub maker_address: String,
    pub market_key: String,
    pub source_order_id: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub side: Side,
    pub observed_at: DateTime<Utc>,
}

impl MakerOrderEvent {
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}

impl fmt::Display for MakerOrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MakerOrder: maker={} market={} order={} side={} qty={} price={}",
            &self.maker_address[..10.min(self.maker_address.len())],
            &self.market_key[..10.min(self.market_key.len())],
            self.source_order_id,
            self.side,
            self.quantity,
            self.price,
        )
    }
}
