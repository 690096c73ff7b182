use async_trait::async_trait;
use uuid::Uuid;

use crate::ports::{ExecutionError, OrderAck, OrderExecution, ScaledOrder};

/// Logs orders instead of submitting them. Used when no venue credentials
/// are configured or `DRY_RUN` is set.
#[derive(Debug, Clone, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl OrderExecution for DryRunExecutor {
    async fn submit_scaled_order(&self, order: &ScaledOrder) -> Result<OrderAck, ExecutionError> {
        tracing::info!(
            account = %order.execution_account_key,
            market = %order.market,
            side = %order.side,
            quantity = %order.quantity,
            price = %order.price,
            client_token = %order.client_token,
            "[DRY-RUN] Would place mirror order"
        );
        Ok(OrderAck {
            order_id: format!("dry-run-{}", Uuid::new_v4()),
            external_reference: None,
        })
    }
}
