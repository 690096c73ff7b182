use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-follower risk policy.
///
/// A zero `max_order_value`, `daily_trade_limit` or `max_open_positions`
/// disables that check. The percent fields are P&L thresholds in percent
/// (15 = 15%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    pub max_order_value: Decimal,
    pub stop_loss_percent: Decimal,
    pub take_profit_percent: Decimal,
    pub daily_trade_limit: u32,
    pub max_open_positions: u32,
    pub auto_pause_on_loss: bool,
    pub min_balance_threshold: Decimal,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            max_order_value: Decimal::from(1_000),
            stop_loss_percent: Decimal::from(20),
            take_profit_percent: Decimal::from(50),
            daily_trade_limit: 50,
            max_open_positions: 10,
            auto_pause_on_loss: false,
            min_balance_threshold: Decimal::ZERO,
        }
    }
}

impl RiskSettings {
    /// Clamp negative inputs to zero so stored garbage cannot invert a check.
    pub fn sanitized(mut self) -> Self {
        self.max_order_value = self.max_order_value.max(Decimal::ZERO);
        self.stop_loss_percent = self.stop_loss_percent.max(Decimal::ZERO);
        self.take_profit_percent = self.take_profit_percent.max(Decimal::ZERO);
        self.min_balance_threshold = self.min_balance_threshold.max(Decimal::ZERO);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_clamps_negative_fields() {
        let settings = RiskSettings {
            max_order_value: Decimal::from(-10),
            stop_loss_percent: Decimal::from(-1),
            ..RiskSettings::default()
        }
        .sanitized();

        assert_eq!(settings.max_order_value, Decimal::ZERO);
        assert_eq!(settings.stop_loss_percent, Decimal::ZERO);
        assert_eq!(settings.take_profit_percent, Decimal::from(50));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let settings: RiskSettings =
            serde_json::from_str(r#"{"max_order_value": "100"}"#).unwrap();
        assert_eq!(settings.max_order_value, Decimal::from(100));
        assert_eq!(settings.daily_trade_limit, 50);
    }
}
