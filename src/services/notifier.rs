use async_trait::async_trait;
use serde_json::json;

use crate::models::MirrorExecutionResult;
use crate::ports::{Notifier, RiskAlert};

/// Telegram notification service. Failures are logged but never block the main flow.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(http: reqwest::Client, bot_token: String, chat_id: String) -> Self {
        Self {
            http,
            bot_token,
            chat_id,
        }
    }

    /// Send a Telegram message. Failures are logged as warnings.
    pub async fn send(&self, message: &str) {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        );

        let body = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    tracing::warn!(
                        status = %resp.status(),
                        "Telegram sendMessage returned non-2xx"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send Telegram notification");
            }
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify_result(&self, result: &MirrorExecutionResult) {
        self.send(&format_mirror_result(result)).await;
    }

    async fn notify_risk(&self, alert: &RiskAlert) {
        self.send(&format_risk_alert(alert)).await;
    }
}

fn short(id: &str) -> String {
    if id.len() > 10 && id.is_ascii() {
        format!("{}...{}", &id[..6], &id[id.len() - 4..])
    } else {
        id.to_string()
    }
}

/// Format a mirror result message.
pub fn format_mirror_result(result: &MirrorExecutionResult) -> String {
    if result.success {
        format!(
            "*Order Mirrored*\nPosition: `{}`\nSide: {}\nSize: {} @ {}\nOrder: `{}`",
            short(&result.position_id),
            result.side,
            result.quantity,
            result.price,
            result.mirrored_order_id,
        )
    } else {
        format!(
            "*Mirror Failed*\nPosition: `{}`\nSide: {}\nSize: {} @ {}\nSource: `{}`\nError: {}",
            short(&result.position_id),
            result.side,
            result.quantity,
            result.price,
            short(&result.source_order_id),
            result.failure_reason.as_deref().unwrap_or("unknown"),
        )
    }
}

/// Format a risk alert message.
pub fn format_risk_alert(alert: &RiskAlert) -> String {
    match alert {
        RiskAlert::StopLoss { position_id, pnl_percent, .. } => format!(
            "*Stop-Loss Triggered*\nPosition: `{}`\nP&L: {}%\nMirroring stopped",
            short(position_id),
            pnl_percent.round_dp(2),
        ),
        RiskAlert::TakeProfit { position_id, pnl_percent, .. } => format!(
            "*Take-Profit Reached*\nPosition: `{}`\nP&L: {}%",
            short(position_id),
            pnl_percent.round_dp(2),
        ),
        RiskAlert::AutoPaused { position_id, win_rate_percent, .. } => format!(
            "*Auto-Paused*\nPosition: `{}`\nWin Rate: {}%\nMirroring stopped",
            short(position_id),
            win_rate_percent.round_dp(1),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use rust_decimal::Decimal;

    #[test]
    fn test_format_failure_includes_reason() {
        let r = MirrorExecutionResult::failed(
            "pos-1",
            "ord-1",
            Decimal::new(90, 2),
            Decimal::from(5),
            Side::Bid,
            "daily limit: 50/50 orders today",
        );
        let msg = format_mirror_result(&r);
        assert!(msg.contains("Mirror Failed"));
        assert!(msg.contains("daily limit"));
    }

    #[test]
    fn test_format_stop_loss() {
        let alert = RiskAlert::StopLoss {
            position_id: "pos-1".into(),
            owner: "alice".into(),
            pnl_percent: Decimal::new(-2512, 2),
        };
        let msg = format_risk_alert(&alert);
        assert!(msg.contains("Stop-Loss"));
        assert!(msg.contains("-25.12%"));
    }

    #[test]
    fn test_short_ids() {
        assert_eq!(short("0x1234567890abcdef"), "0x1234...cdef");
        assert_eq!(short("pos-1"), "pos-1");
    }
}
