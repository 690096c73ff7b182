use std::sync::Arc;

use crate::execution::PositionRegistry;
use crate::ingestion::EventIngestor;
use crate::models::TrackedPosition;
use crate::ports::PositionSource;

/// Position lifecycle: keeps durable storage, the in-memory registry and the
/// ingestor's subscriptions in step.
#[derive(Clone)]
pub struct MirrorService {
    registry: PositionRegistry,
    ingestor: EventIngestor,
    positions: Arc<dyn PositionSource>,
}

impl MirrorService {
    pub fn new(registry: PositionRegistry, ingestor: EventIngestor, positions: Arc<dyn PositionSource>) -> Self {
        Self {
            registry,
            ingestor,
            positions,
        }
    }

    pub fn registry(&self) -> &PositionRegistry {
        &self.registry
    }

    pub fn ingestor(&self) -> &EventIngestor {
        &self.ingestor
    }

    /// Load every active position from storage into the registry and
    /// subscribe the ingestor to their makers. Returns the number loaded.
    pub async fn rehydrate(&self) -> anyhow::Result<usize> {
        let positions = self.positions.load_all_active_positions().await?;
        let count = positions.len();

        for position in positions {
            self.registry.register(position);
        }
        self.ingestor.sync_with_registry();

        tracing::info!(positions = count, buckets = self.registry.tracked_pairs().len(), "Registry rehydrated");
        Ok(count)
    }

    /// Persist then register (upsert) a position. Persistence failure
    /// leaves the registry untouched.
    pub async fn open_position(&self, position: TrackedPosition) -> anyhow::Result<()> {
        self.positions.save_position(&position).await?;

        let previous = self.registry.find_by_id(&position.position_id);
        let (maker, market) = position.bucket_key();
        self.registry.register(position.clone());

        if let Some(prev) = previous {
            self.release_subscription(&prev.target_maker, &prev.market_key);
        }
        self.ingestor.subscribe(&market, &[maker]);

        tracing::info!(
            position_id = %position.position_id,
            owner = %position.owner,
            maker = %position.target_maker,
            market = %position.market_key,
            ratio = %position.ratio,
            active = position.active,
            "Position registered"
        );
        Ok(())
    }

    /// Stop mirroring a position. Idempotent: closing an unknown id
    /// returns `Ok(false)`.
    pub async fn close_position(&self, position_id: &str) -> anyhow::Result<bool> {
        let Some(removed) = self.registry.unregister(position_id) else {
            return Ok(false);
        };
        self.release_subscription(&removed.target_maker, &removed.market_key);

        tracing::info!(position_id, maker = %removed.target_maker, market = %removed.market_key, "Position unregistered");

        self.positions.deactivate_position(position_id, "closed").await?;
        Ok(true)
    }

    fn release_subscription(&self, maker: &str, market: &str) {
        if !self.registry.has_bucket(maker, market) {
            self.ingestor.unsubscribe(market, maker);
        }
    }
}
