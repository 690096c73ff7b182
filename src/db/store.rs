use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{Capability, MirrorExecutionResult, TrackedPosition};
use crate::ports::{CapabilityStore, PositionSource, ResultSink};

use super::{capability_repo, position_repo, result_repo};

/// Postgres-backed adapter for the durable ports.
#[derive(Debug, Clone)]
pub struct PgMirrorStore {
    pool: PgPool,
}

impl PgMirrorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ResultSink for PgMirrorStore {
    async fn record(&self, result: &MirrorExecutionResult) -> anyhow::Result<()> {
        result_repo::insert_result(&self.pool, result).await?;
        Ok(())
    }
}

#[async_trait]
impl CapabilityStore for PgMirrorStore {
    async fn get_capability(&self, capability_id: &str) -> anyhow::Result<Option<Capability>> {
        capability_repo::get_capability(&self.pool, capability_id).await
    }
}

#[async_trait]
impl PositionSource for PgMirrorStore {
    async fn load_all_active_positions(&self) -> anyhow::Result<Vec<TrackedPosition>> {
        position_repo::load_active(&self.pool).await
    }

    async fn deactivate_position(&self, position_id: &str, reason: &str) -> anyhow::Result<()> {
        if !position_repo::deactivate(&self.pool, position_id, reason).await? {
            tracing::warn!(position_id, "Deactivated position has no stored row");
        }
        Ok(())
    }

    async fn save_position(&self, position: &TrackedPosition) -> anyhow::Result<()> {
        position_repo::upsert_position(&self.pool, position).await
    }
}
