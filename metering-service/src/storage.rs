use std::sync::Arc;

use anyhow::Context;
use metering_client::{
    db::{InMemoryRepository, PgConsumptionRepository},
    ConsumptionStore,
};
use sqlx::postgres::PgPoolOptions;

use crate::config::{StorageConfig, StorageKind};

/// Builds the configured consumption store.
pub async fn connect(cfg: &StorageConfig) -> anyhow::Result<Arc<dyn ConsumptionStore>> {
    match cfg.kind {
        StorageKind::Postgres => {
            let uri = cfg
                .uri
                .as_deref()
                .context("storage.uri is required when storage.kind = \"postgres\"")?;

            let pool = PgPoolOptions::new()
                .max_connections(cfg.max_connections)
                .connect(uri)
                .await
                .context("failed to connect to postgres")?;

            tracing::info!(max_connections = cfg.max_connections, "connected to postgres store");
            Ok(Arc::new(PgConsumptionRepository::new(pool)))
        }
        StorageKind::Memory => {
            tracing::warn!("using in-memory store; data is lost on shutdown");
            Ok(Arc::new(InMemoryRepository::new()))
        }
    }
}
