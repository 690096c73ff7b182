use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use uuid::Uuid;

use crate::ports::{ExecutionError, OrderAck, OrderExecution, ScaledOrder};

/// Bounded retry for transient submission failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time.
    pub base_delay: Duration,
    /// Per-attempt deadline; hitting it counts as a transient timeout.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(1_500),
            attempt_timeout: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// Outcome of a submission, successful or not, with the attempt count.
#[derive(Debug)]
pub struct Submission {
    pub outcome: Result<OrderAck, ExecutionError>,
    pub attempts: u32,
}

/// Wraps the execution collaborator with per-attempt timeouts and bounded,
/// classified retry. Validation and authorization errors are never retried.
#[derive(Clone)]
pub struct OrderExecutor {
    venue: Arc<dyn OrderExecution>,
    policy: RetryPolicy,
}

impl OrderExecutor {
    pub fn new(venue: Arc<dyn OrderExecution>, policy: RetryPolicy) -> Self {
        Self { venue, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Submit `order`, minting a fresh client token for every attempt.
    pub async fn submit(&self, order: &ScaledOrder) -> Submission {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let mut this_attempt = order.clone();
            this_attempt.client_token = Uuid::new_v4().to_string();

            let result = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.venue.submit_scaled_order(&this_attempt),
            )
            .await
            {
                Ok(r) => r,
                Err(_) => Err(ExecutionError::Timeout(format!(
                    "no response within {}ms",
                    self.policy.attempt_timeout.as_millis()
                ))),
            };

            let result = match result {
                Ok(ack) if ack.order_id.is_empty() => Err(ExecutionError::Rejected(
                    "venue acknowledged without an order id".into(),
                )),
                other => other,
            };

            match result {
                Ok(ack) => {
                    return Submission {
                        outcome: Ok(ack),
                        attempts: attempt,
                    };
                }
                Err(e) if e.is_transient() && attempt <= self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        market = %order.market,
                        attempt,
                        max_attempts = self.policy.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient submission failure, retrying"
                    );
                    counter!("mirror_submit_retries").increment(1);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Submission {
                        outcome: Err(e),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
