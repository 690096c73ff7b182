use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// Outcome of attempting to mirror one event for one position.
///
/// `success == true` always carries a non-empty `mirrored_order_id`; use the
/// constructors rather than building the struct by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorExecutionResult {
    pub position_id: String,
    pub source_order_id: String,
    pub mirrored_order_id: String,
    pub price: Decimal,
    /// The scaled quantity; zero when scaling produced a non-positive value.
    pub quantity: Decimal,
    pub side: Side,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub external_reference: Option<String>,
}

impl MirrorExecutionResult {
    pub fn succeeded(
        position_id: &str,
        source_order_id: &str,
        mirrored_order_id: String,
        price: Decimal,
        quantity: Decimal,
        side: Side,
        external_reference: Option<String>,
    ) -> Self {
        debug_assert!(!mirrored_order_id.is_empty());
        Self {
            position_id: position_id.to_string(),
            source_order_id: source_order_id.to_string(),
            mirrored_order_id,
            price,
            quantity,
            side,
            success: true,
            failure_reason: None,
            external_reference,
        }
    }

    pub fn failed(
        position_id: &str,
        source_order_id: &str,
        price: Decimal,
        quantity: Decimal,
        side: Side,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            position_id: position_id.to_string(),
            source_order_id: source_order_id.to_string(),
            mirrored_order_id: String::new(),
            price,
            quantity: quantity.max(Decimal::ZERO),
            side,
            success: false,
            failure_reason: Some(reason.into()),
            external_reference: None,
        }
    }

    pub fn order_value(&self) -> Decimal {
        self.quantity * self.price
    }
}
