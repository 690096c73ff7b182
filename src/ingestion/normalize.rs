use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{MakerOrderEvent, Side};
use crate::ports::RawActivityRecord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("missing field: {0}")]
    Missing(&'static str),

    #[error("unknown side: {0}")]
    UnknownSide(String),

    #[error("non-positive {field}: {value}")]
    NonPositive { field: &'static str, value: Decimal },

    #[error("record for market {found} returned under {expected}")]
    WrongMarket { expected: String, found: String },

    #[error("unparseable timestamp")]
    BadTimestamp,
}

/// Turn a raw venue record into a `MakerOrderEvent`, enforcing positive
/// price and quantity and a venue timestamp. `market` is the market that
/// was queried.
pub fn normalize_record(raw: &RawActivityRecord, market: &str) -> Result<MakerOrderEvent, NormalizeError> {
    let maker = raw
        .maker
        .as_deref()
        .filter(|m| !m.is_empty())
        .ok_or(NormalizeError::Missing("maker"))?;
    let order_id = raw
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(NormalizeError::Missing("id"))?;

    if let Some(found) = raw.market.as_deref() {
        if !found.is_empty() && found != market {
            return Err(NormalizeError::WrongMarket {
                expected: market.to_string(),
                found: found.to_string(),
            });
        }
    }

    let side_str = raw.side.as_deref().ok_or(NormalizeError::Missing("side"))?;
    let side = Side::from_api_str(side_str).ok_or_else(|| NormalizeError::UnknownSide(side_str.to_string()))?;

    let price = raw.price.ok_or(NormalizeError::Missing("price"))?;
    if price <= Decimal::ZERO {
        return Err(NormalizeError::NonPositive { field: "price", value: price });
    }
    let quantity = raw.quantity.ok_or(NormalizeError::Missing("quantity"))?;
    if quantity <= Decimal::ZERO {
        return Err(NormalizeError::NonPositive {
            field: "quantity",
            value: quantity,
        });
    }

    // The cursor only works off venue time.
    let ts = raw.timestamp.as_ref().ok_or(NormalizeError::Missing("timestamp"))?;
    let observed_at = parse_timestamp(ts).ok_or(NormalizeError::BadTimestamp)?;

    Ok(MakerOrderEvent {
        maker_address: maker.to_string(),
        market_key: market.to_string(),
        source_order_id: order_id.to_string(),
        price,
        quantity,
        side,
        observed_at,
    })
}

/// Accepts epoch seconds, epoch milliseconds, numeric strings and RFC 3339.
pub fn parse_timestamp(ts: &serde_json::Value) -> Option<DateTime<Utc>> {
    match ts {
        serde_json::Value::Number(n) => from_epoch(n.as_i64()?),
        serde_json::Value::String(s) => {
            if let Ok(n) = s.parse::<i64>() {
                return from_epoch(n);
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }
        _ => None,
    }
}

fn from_epoch(n: i64) -> Option<DateTime<Utc>> {
    // If >1e12, it's milliseconds
    if n > 1_000_000_000_000 {
        DateTime::from_timestamp_millis(n)
    } else {
        DateTime::from_timestamp(n, 0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw() -> RawActivityRecord {
        RawActivityRecord {
            id: Some("ord-1".into()),
            maker: Some("0xmaker".into()),
            market: Some("SUI_USDC".into()),
            side: Some("bid".into()),
            price: Some(Decimal::new(90, 2)),
            quantity: Some(Decimal::from(1_000)),
            timestamp: Some(json!(1_700_000_000)),
        }
    }

    #[test]
    fn test_normalizes_valid_record() {
        let ev = normalize_record(&raw(), "SUI_USDC").unwrap();
        assert_eq!(ev.maker_address, "0xmaker");
        assert_eq!(ev.source_order_id, "ord-1");
        assert_eq!(ev.side, Side::Bid);
        assert_eq!(ev.quantity, Decimal::from(1_000));
        assert_eq!(ev.observed_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let mut r = raw();
        r.quantity = Some(Decimal::ZERO);
        assert!(matches!(
            normalize_record(&r, "SUI_USDC"),
            Err(NormalizeError::NonPositive { field: "quantity", .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let mut r = raw();
        r.price = Some(Decimal::from(-1));
        assert!(matches!(
            normalize_record(&r, "SUI_USDC"),
            Err(NormalizeError::NonPositive { field: "price", .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_side_and_missing_maker() {
        let mut r = raw();
        r.side = Some("hold".into());
        assert_eq!(
            normalize_record(&r, "SUI_USDC"),
            Err(NormalizeError::UnknownSide("hold".into()))
        );

        let mut r = raw();
        r.maker = None;
        assert_eq!(normalize_record(&r, "SUI_USDC"), Err(NormalizeError::Missing("maker")));
    }

    #[test]
    fn test_rejects_missing_timestamp() {
        let mut r = raw();
        r.timestamp = None;
        assert_eq!(normalize_record(&r, "SUI_USDC"), Err(NormalizeError::Missing("timestamp")));

        r.timestamp = Some(json!("yesterday"));
        assert_eq!(normalize_record(&r, "SUI_USDC"), Err(NormalizeError::BadTimestamp));
    }

    #[test]
    fn test_rejects_record_from_other_market() {
        let r = raw();
        assert!(matches!(
            normalize_record(&r, "ETH_USDC"),
            Err(NormalizeError::WrongMarket { .. })
        ));
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let secs = parse_timestamp(&json!(1_700_000_000)).unwrap();
        let millis = parse_timestamp(&json!(1_700_000_000_123i64)).unwrap();
        let string = parse_timestamp(&json!("1700000000")).unwrap();
        let rfc = parse_timestamp(&json!("2023-11-14T22:13:20Z")).unwrap();

        assert_eq!(secs, string);
        assert_eq!(secs, rfc);
        assert_eq!(millis.timestamp_millis(), 1_700_000_000_123);
        assert!(parse_timestamp(&json!(true)).is_none());
    }
}
