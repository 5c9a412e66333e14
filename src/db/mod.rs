use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Settings;

pub mod models;
pub mod postgres;

pub use postgres::PostgresClient;

use models::{Profile, SyncMetadata};

/// Persistence needed by the indexer.
///
/// Backed by PostgreSQL in production; tests substitute an in-memory fake.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Plain insert, for full backfills into an empty table.
    async fn insert_profiles(&self, profiles: &[Profile]) -> anyhow::Result<()>;

    /// Insert or replace keyed on `ens_name`, for incremental runs.
    async fn upsert_profiles(&self, profiles: &[Profile]) -> anyhow::Result<()>;

    /// Append one run record to the watermark history.
    async fn insert_sync_metadata(&self, metadata: &SyncMetadata) -> anyhow::Result<()>;

    /// Most recent run record, if any.
    async fn last_sync_metadata(&self) -> anyhow::Result<Option<SyncMetadata>>;
}

/// Database handle for the indexer.
///
/// PostgreSQL holds the profile rows and the append-only run history.
#[derive(Clone)]
pub struct Database {
    pub postgres: Arc<PostgresClient>,
}

impl Database {
    pub async fn new(settings: Arc<Settings>) -> anyhow::Result<Self> {
        let postgres = PostgresClient::new(settings.postgres.clone()).await?;

        // Run migrations
        postgres.migrate().await?;

        Ok(Self {
            postgres: Arc::new(postgres),
        })
    }
}

#[async_trait]
impl ProfileStore for Database {
    async fn insert_profiles(&self, profiles: &[Profile]) -> anyhow::Result<()> {
        self.postgres.insert_profiles(profiles).await
    }

    async fn upsert_profiles(&self, profiles: &[Profile]) -> anyhow::Result<()> {
        self.postgres.upsert_profiles(profiles).await
    }

    async fn insert_sync_metadata(&self, metadata: &SyncMetadata) -> anyhow::Result<()> {
        self.postgres.insert_sync_metadata(metadata).await
    }

    async fn last_sync_metadata(&self) -> anyhow::Result<Option<SyncMetadata>> {
        self.postgres.last_sync_metadata().await
    }
}
