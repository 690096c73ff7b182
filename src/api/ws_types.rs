use serde::Serialize;

use crate::ingestion::IngestorState;
use crate::models::MirrorExecutionResult;
use crate::ports::RiskAlert;

/// Messages broadcast to all connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "mirror_result")]
    MirrorResult(MirrorExecutionResult),

    #[serde(rename = "risk_alert")]
    RiskAlert(RiskAlert),

    #[serde(rename = "ingestor_state")]
    IngestorState(IngestorState),
}
