use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("ratio {0} outside [1, 100]")]
pub struct InvalidRatio(pub i64);

/// Percentage of the maker's quantity to replicate, always within `[1, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Ratio(u8);

impl Ratio {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;

    pub fn new(value: i64) -> Result<Self, InvalidRatio> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(InvalidRatio(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Ratio as a fraction, e.g. 50 → 0.5.
    pub fn as_fraction(self) -> Decimal {
        Decimal::from(self.0) / Decimal::ONE_HUNDRED
    }
}

impl TryFrom<i64> for Ratio {
    type Error = InvalidRatio;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ratio::new(value)
    }
}

impl From<Ratio> for i64 {
    fn from(r: Ratio) -> Self {
        r.0 as i64
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// A follower's subscription to mirror one maker on one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPosition {
    pub position_id: String,
    pub owner: String,
    pub target_maker: String,
    pub market_key: String,
    pub ratio: Ratio,
    pub active: bool,
    /// Opaque reference to the follower's funding/execution account.
    pub execution_account_key: String,
    /// Present only in delegated-authority mode.
    #[serde(default)]
    pub capability_id: Option<String>,
}

impl TrackedPosition {
    /// Registry bucket key.
    pub fn bucket_key(&self) -> (String, String) {
        (self.target_maker.clone(), self.market_key.clone())
    }
}
