pub mod capability;
pub mod event;
pub mod position;
pub mod result;
pub mod risk;

pub use capability::Capability;
pub use event::MakerOrderEvent;
pub use position::{InvalidRatio, Ratio, TrackedPosition};
pub use result::MirrorExecutionResult;
pub use risk::RiskSettings;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Venues disagree on naming; accept both order-book and buy/sell spellings.
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BID" | "BUY" | "0" => Some(Side::Bid),
            "ASK" | "SELL" | "1" => Some(Side::Ask),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
