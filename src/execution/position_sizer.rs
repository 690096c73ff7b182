use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::Ratio;

/// Scale a maker's quantity by the follower's ratio:
/// `quantity * ratio / 100`.
///
/// With `decimal_places` set, the result is truncated toward zero so the
/// follower never submits more than its share; tiny quantities can then
/// scale to zero, which the dispatcher reports as a failure.
pub fn scale_quantity(quantity: Decimal, ratio: Ratio, decimal_places: Option<u32>) -> Decimal {
    let scaled = quantity * ratio.as_fraction();
    match decimal_places {
        Some(dp) => scaled.round_dp_with_strategy(dp, RoundingStrategy::ToZero),
        None => scaled,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
