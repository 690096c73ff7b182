use std::collections::HashMap;
use std::sync::Arc;

use metrics::gauge;
use parking_lot::RwLock;

use crate::models::TrackedPosition;

type BucketKey = (String, String);

/// In-memory index of which followers mirror which `(maker, market)` pair.
///
/// Buckets are stored behind `Arc` so readers clone a pointer under the read
/// lock and copy outside it; writers copy-on-write the touched bucket only.
#[derive(Clone, Default)]
pub struct PositionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    /// (maker, market) → positions in registration order.
    buckets: HashMap<BucketKey, Arc<Vec<TrackedPosition>>>,
    /// position_id → bucket it currently lives in.
    by_id: HashMap<String, BucketKey>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a position, or replace the stored one with the same id in place.
    /// A changed maker/market moves the position to its new bucket.
    pub fn register(&self, position: TrackedPosition) {
        let key = position.bucket_key();
        let mut inner = self.inner.write();

        if let Some(old_key) = inner.by_id.get(&position.position_id).cloned() {
            if old_key == key {
                if let Some(bucket) = inner.buckets.get_mut(&key) {
                    let bucket = Arc::make_mut(bucket);
                    if let Some(slot) = bucket
                        .iter_mut()
                        .find(|p| p.position_id == position.position_id)
                    {
                        *slot = position;
                    }
                }
                return;
            }
            inner.remove_from_bucket(&old_key, &position.position_id);
        }

        inner
            .by_id
            .insert(position.position_id.clone(), key.clone());
        let bucket = inner.buckets.entry(key).or_default();
        Arc::make_mut(bucket).push(position);

        inner.publish_gauges();
    }

    /// Remove a position. Unknown ids are a no-op. Returns the removed
    /// position so callers can tell whether its bucket is now gone.
    pub fn unregister(&self, position_id: &str) -> Option<TrackedPosition> {
        let mut inner = self.inner.write();
        let key = inner.by_id.remove(position_id)?;
        let removed = inner.remove_from_bucket(&key, position_id);
        inner.publish_gauges();
        removed
    }

    /// Snapshot of every position in the bucket, in registration order.
    pub fn find_by_maker(&self, maker: &str, market: &str) -> Vec<TrackedPosition> {
        let bucket = {
            let inner = self.inner.read();
            inner
                .buckets
                .get(&(maker.to_string(), market.to_string()))
                .cloned()
        };
        bucket.map(|b| b.as_ref().clone()).unwrap_or_default()
    }

    pub fn find_by_id(&self, position_id: &str) -> Option<TrackedPosition> {
        let inner = self.inner.read();
        let key = inner.by_id.get(position_id)?;
        inner
            .buckets
            .get(key)?
            .iter()
            .find(|p| p.position_id == position_id)
            .cloned()
    }

    pub fn has_bucket(&self, maker: &str, market: &str) -> bool {
        self.inner
            .read()
            .buckets
            .contains_key(&(maker.to_string(), market.to_string()))
    }

    /// Every `(maker, market)` pair with at least one position.
    pub fn tracked_pairs(&self) -> Vec<(String, String)> {
        self.inner.read().buckets.keys().cloned().collect()
    }

    pub fn all(&self) -> Vec<TrackedPosition> {
        let inner = self.inner.read();
        inner
            .buckets
            .values()
            .flat_map(|b| b.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RegistryInner {
    fn remove_from_bucket(&mut self, key: &BucketKey, position_id: &str) -> Option<TrackedPosition> {
        let bucket = self.buckets.get_mut(key)?;
        let idx = bucket.iter().position(|p| p.position_id == position_id)?;
        let removed = Arc::make_mut(bucket).remove(idx);
        if bucket.is_empty() {
            self.buckets.remove(key);
        }
        Some(removed)
    }

    fn publish_gauges(&self) {
        gauge!("tracked_positions").set(self.by_id.len() as f64);
        gauge!("tracked_buckets").set(self.buckets.len() as f64);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ratio;

    fn position(id: &str, maker: &str, market: &str, ratio: i64) -> TrackedPosition {
        TrackedPosition {
            position_id: id.into(),
            owner: "owner-1".into(),
            target_maker: maker.into(),
            market_key: market.into(),
            ratio: Ratio::new(ratio).unwrap(),
            active: true,
            execution_account_key: "acct-1".into(),
            capability_id: None,
        }
    }

    #[test]
    fn test_register_and_find() {
        let registry = PositionRegistry::new();
        registry.register(position("p1", "0xmaker", "SUI_USDC", 50));
        registry.register(position("p2", "0xmaker", "SUI_USDC", 25));
        registry.register(position("p3", "0xother", "SUI_USDC", 10));

        let found = registry.find_by_maker("0xmaker", "SUI_USDC");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].position_id, "p1");
        assert_eq!(found[1].position_id, "p2");
        assert_eq!(registry.find_by_id("p3").unwrap().target_maker, "0xother");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_register_is_upsert_in_place() {
        let registry = PositionRegistry::new();
        registry.register(position("p1", "0xmaker", "M", 50));
        registry.register(position("p2", "0xmaker", "M", 50));
        registry.register(position("p1", "0xmaker", "M", 75));

        let found = registry.find_by_maker("0xmaker", "M");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].position_id, "p1");
        assert_eq!(found[0].ratio.get(), 75);
    }

    #[test]
    fn test_register_moves_between_buckets() {
        let registry = PositionRegistry::new();
        registry.register(position("p1", "0xmaker", "M1", 50));
        registry.register(position("p1", "0xmaker", "M2", 50));

        assert!(!registry.has_bucket("0xmaker", "M1"));
        assert_eq!(registry.find_by_maker("0xmaker", "M2").len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_drops_empty_bucket() {
        let registry = PositionRegistry::new();
        registry.register(position("p1", "0xmaker", "M", 50));
        registry.register(position("p2", "0xmaker", "M", 50));

        assert!(registry.unregister("p1").is_some());
        assert!(registry.has_bucket("0xmaker", "M"));

        assert!(registry.unregister("p2").is_some());
        assert!(!registry.has_bucket("0xmaker", "M"));
        assert!(registry.tracked_pairs().is_empty());
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let registry = PositionRegistry::new();
        registry.register(position("p1", "0xmaker", "M", 50));
        assert!(registry.unregister("nope").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let registry = PositionRegistry::new();
        registry.register(position("p1", "0xmaker", "M", 50));

        let snapshot = registry.find_by_maker("0xmaker", "M");
        registry.unregister("p1");
        registry.register(position("p9", "0xmaker", "M", 10));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].position_id, "p1");
    }
}
