use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::api::ws_types::WsMessage;
use crate::models::MirrorExecutionResult;
use crate::ports::{Notifier, ResultSink, RiskAlert};

/// Production result sink: persists each result, then broadcasts it to
/// WebSocket clients and forwards it to the notifier.
///
/// Also acts as the dispatcher's notifier so risk alerts reach the same
/// audiences.
#[derive(Clone)]
pub struct ResultRecorder {
    store: Arc<dyn ResultSink>,
    ws_tx: broadcast::Sender<WsMessage>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ResultRecorder {
    pub fn new(
        store: Arc<dyn ResultSink>,
        ws_tx: broadcast::Sender<WsMessage>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            store,
            ws_tx,
            notifier,
        }
    }

    fn broadcast(&self, msg: WsMessage) {
        // No receivers is not an error
        let _ = self.ws_tx.send(msg);
    }
}

#[async_trait]
impl ResultSink for ResultRecorder {
    async fn record(&self, result: &MirrorExecutionResult) -> anyhow::Result<()> {
        let stored = self.store.record(result).await;

        self.broadcast(WsMessage::MirrorResult(result.clone()));
        if let Some(n) = &self.notifier {
            n.notify_result(result).await;
        }

        stored
    }
}

#[async_trait]
impl Notifier for ResultRecorder {
    async fn notify_result(&self, result: &MirrorExecutionResult) {
        if let Some(n) = &self.notifier {
            n.notify_result(result).await;
        }
    }

    async fn notify_risk(&self, alert: &RiskAlert) {
        self.broadcast(WsMessage::RiskAlert(alert.clone()));
        if let Some(n) = &self.notifier {
            n.notify_risk(alert).await;
        }
    }
}
