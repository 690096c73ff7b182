use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ports::RawActivityRecord;

// ---------------------------------------------------------------------------
// Activity (REST)
// ---------------------------------------------------------------------------

/// Activity responses come either as a bare array or wrapped in `data`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiActivityResponse {
    Bare(Vec<RawActivityRecord>),
    Wrapped { data: Vec<RawActivityRecord> },
}

impl ApiActivityResponse {
    pub fn into_records(self) -> Vec<RawActivityRecord> {
        match self {
            ApiActivityResponse::Bare(r) => r,
            ApiActivityResponse::Wrapped { data } => data,
        }
    }
}

// ---------------------------------------------------------------------------
// Orders (REST)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ApiOrderRequest {
    pub account: String,
    pub market: String,
    pub side: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub client_order_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiOrderResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, alias = "orderID")]
    pub order_id: Option<String>,
    #[serde(default, alias = "transaction_id", alias = "tx_digest")]
    pub tx_hash: Option<String>,
    #[serde(default, alias = "errorMsg")]
    pub error_msg: Option<String>,
}

// ---------------------------------------------------------------------------
// Balance (REST)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ApiBalance {
    #[serde(alias = "balance")]
    pub available: Decimal,
}
