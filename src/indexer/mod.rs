//! The indexing pipeline: fetch, resolve, dedup, persist.
//!
//! A run fetches registration logs for a block range, resolves each event
//! into a profile, collapses duplicate names, writes the survivors and
//! appends a run record carrying the watermark for the next incremental
//! run. Three entry points share the pipeline and differ only in where
//! the range starts and how profiles are written.

use log::info;

use crate::db::models::SyncMetadata;
use crate::db::ProfileStore;
use crate::error::IndexError;
use crate::fetcher::{FetcherConfig, RangeLogFetcher};
use crate::orchestrator::{BatchOrchestrator, OrchestratorConfig};
use crate::resolver::ResolveProfile;
use crate::rpc::ChainClient;

pub mod dedup;

pub use dedup::dedup_latest;

/// Summary of one completed indexing run.
#[derive(Debug)]
pub struct RunReport {
    /// Watermark recorded for the run; the next incremental run starts
    /// just past it.
    pub last_block_number: i64,
    /// Profiles written after dedup.
    pub profiles_written: usize,
    /// Names that could not be resolved.
    pub fails: Vec<String>,
}

/// How resolved profiles reach the profiles table.
enum WriteMode {
    /// Plain insert; the table is assumed empty.
    Insert,
    /// Insert or replace keyed on name.
    Upsert,
}

pub struct Indexer<C, R, S> {
    fetcher: RangeLogFetcher<C>,
    orchestrator: BatchOrchestrator<R>,
    store: S,
    deploy_block: u64,
}

impl<C, R, S> Indexer<C, R, S>
where
    C: ChainClient,
    R: ResolveProfile,
    S: ProfileStore,
{
    pub fn new(
        client: C,
        resolver: R,
        store: S,
        fetcher_config: FetcherConfig,
        orchestrator_config: OrchestratorConfig,
        deploy_block: u64,
    ) -> Self {
        Self {
            fetcher: RangeLogFetcher::new(client, fetcher_config),
            orchestrator: BatchOrchestrator::new(resolver, orchestrator_config),
            store,
            deploy_block,
        }
    }

    /// Full backfill from the registrar deploy block into an empty
    /// profiles table.
    pub async fn index_from_scratch(&self) -> Result<RunReport, IndexError> {
        info!("Starting full backfill from block {}", self.deploy_block);
        self.run(self.deploy_block, WriteMode::Insert).await
    }

    /// Index from an explicit start block, replacing existing rows for
    /// re-registered names.
    pub async fn index_from_block(&self, start_block: u64) -> Result<RunReport, IndexError> {
        info!("Starting incremental run from block {start_block}");
        self.run(start_block, WriteMode::Upsert).await
    }

    /// Resume from the watermark of the most recent completed run.
    /// Fails with [`IndexError::NoWatermark`] when no run has completed.
    pub async fn index_from_last_sync(&self) -> Result<RunReport, IndexError> {
        let metadata = self
            .store
            .last_sync_metadata()
            .await
            .map_err(IndexError::persist)?
            .ok_or(IndexError::NoWatermark)?;

        let start_block = metadata.last_block_number as u64 + 1;
        info!(
            "Resuming from watermark {} (run of {})",
            metadata.last_block_number, metadata.created_at
        );
        self.run(start_block, WriteMode::Upsert).await
    }

    async fn run(&self, start_block: u64, mode: WriteMode) -> Result<RunReport, IndexError> {
        let fetched = self.fetcher.fetch(start_block, None).await?;
        let outcome = self.orchestrator.resolve_all(&fetched.logs).await;
        let profiles = dedup_latest(outcome.profiles);

        // A run that resolves nothing still advances to the fetched tip,
        // otherwise an empty range would be refetched forever.
        let last_block_number = profiles
            .iter()
            .map(|p| p.emitted_block_number)
            .max()
            .unwrap_or(fetched.to_block as i64);

        match mode {
            WriteMode::Insert => self
                .store
                .insert_profiles(&profiles)
                .await
                .map_err(IndexError::persist)?,
            WriteMode::Upsert => self
                .store
                .upsert_profiles(&profiles)
                .await
                .map_err(IndexError::persist)?,
        }

        let metadata = SyncMetadata::new(last_block_number, outcome.fails.clone());
        self.store
            .insert_sync_metadata(&metadata)
            .await
            .map_err(IndexError::persist)?;

        info!(
            "Run complete: {} profiles written, {} fails, watermark {last_block_number}",
            profiles.len(),
            outcome.fails.len()
        );

        Ok(RunReport {
            last_block_number,
            profiles_written: profiles.len(),
            fails: outcome.fails,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::db::models::{
        encoded_registration_log, sample_profile, EventLog, Profile, RegistrationEvent,
    };
    use crate::error::{ResolveError, Stage};

    const DEPLOY_BLOCK: u64 = 9_380_471;

    fn fast_fetcher_config() -> FetcherConfig {
        FetcherConfig {
            query_span: 2_000,
            batch_size: 4,
            retry_base_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(4),
            max_attempts: 3,
            inter_batch_delay: Duration::from_millis(1),
        }
    }

    fn fast_orchestrator_config() -> OrchestratorConfig {
        OrchestratorConfig {
            group_size: 3,
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(4),
            inter_group_delay: Duration::from_millis(1),
        }
    }

    struct FakeChain {
        tip: u64,
        logs: Vec<EventLog>,
        requested: Mutex<Vec<(u64, u64)>>,
    }

    impl FakeChain {
        fn new(tip: u64, logs: Vec<EventLog>) -> Arc<Self> {
            Arc::new(Self {
                tip,
                logs,
                requested: Mutex::new(vec![]),
            })
        }
    }

    #[async_trait]
    impl ChainClient for Arc<FakeChain> {
        async fn block_number(&self) -> anyhow::Result<u64> {
            Ok(self.tip)
        }

        async fn registration_logs(&self, from: u64, to: u64) -> anyhow::Result<Vec<EventLog>> {
            self.requested.lock().unwrap().push((from, to));
            Ok(self
                .logs
                .iter()
                .filter(|log| log.block_number >= from && log.block_number <= to)
                .cloned()
                .collect())
        }
    }

    /// Resolves every event into a sample profile, except the names it is
    /// told have no resolver.
    #[derive(Default)]
    struct FakeResolver {
        not_found: HashSet<String>,
    }

    #[async_trait]
    impl ResolveProfile for Arc<FakeResolver> {
        async fn resolve(&self, event: &RegistrationEvent) -> Result<Profile, ResolveError> {
            if self.not_found.contains(&event.name) {
                return Err(ResolveError::NotFound(event.name.clone()));
            }
            Ok(sample_profile(&event.name, event.block_number as i64))
        }
    }

    /// In-memory store tracking which write path was used.
    #[derive(Default)]
    struct FakeStore {
        inserted: Mutex<Vec<Profile>>,
        upserted: Mutex<Vec<Profile>>,
        metadata: Mutex<Vec<SyncMetadata>>,
        fail_writes: bool,
    }

    #[async_trait]
    impl ProfileStore for Arc<FakeStore> {
        async fn insert_profiles(&self, profiles: &[Profile]) -> anyhow::Result<()> {
            if self.fail_writes {
                anyhow::bail!("connection reset");
            }
            self.inserted.lock().unwrap().extend_from_slice(profiles);
            Ok(())
        }

        async fn upsert_profiles(&self, profiles: &[Profile]) -> anyhow::Result<()> {
            if self.fail_writes {
                anyhow::bail!("connection reset");
            }
            let mut upserted = self.upserted.lock().unwrap();
            for profile in profiles {
                upserted.retain(|p: &Profile| p.ens_name != profile.ens_name);
                upserted.push(profile.clone());
            }
            Ok(())
        }

        async fn insert_sync_metadata(&self, metadata: &SyncMetadata) -> anyhow::Result<()> {
            self.metadata.lock().unwrap().push(metadata.clone());
            Ok(())
        }

        async fn last_sync_metadata(&self) -> anyhow::Result<Option<SyncMetadata>> {
            Ok(self.metadata.lock().unwrap().last().cloned())
        }
    }

    fn indexer(
        chain: Arc<FakeChain>,
        resolver: Arc<FakeResolver>,
        store: Arc<FakeStore>,
    ) -> Indexer<Arc<FakeChain>, Arc<FakeResolver>, Arc<FakeStore>> {
        Indexer::new(
            chain,
            resolver,
            store,
            fast_fetcher_config(),
            fast_orchestrator_config(),
            DEPLOY_BLOCK,
        )
    }

    #[tokio::test]
    async fn backfill_inserts_and_records_watermark() {
        let event_block = DEPLOY_BLOCK + 1_200;
        let chain = FakeChain::new(
            DEPLOY_BLOCK + 2_000,
            vec![encoded_registration_log("alice", event_block, 0)],
        );
        let store = Arc::new(FakeStore::default());

        let report = indexer(chain, Arc::new(FakeResolver::default()), store.clone())
            .index_from_scratch()
            .await
            .unwrap();

        assert_eq!(report.profiles_written, 1);
        assert_eq!(report.last_block_number, event_block as i64);
        assert!(report.fails.is_empty());

        let inserted = store.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].ens_name, "alice.eth");

        let metadata = store.metadata.lock().unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].last_block_number, event_block as i64);
    }

    #[tokio::test]
    async fn re_registered_name_keeps_latest_block() {
        let chain = FakeChain::new(
            DEPLOY_BLOCK + 1_000,
            vec![
                encoded_registration_log("alice", DEPLOY_BLOCK + 100, 0),
                encoded_registration_log("alice", DEPLOY_BLOCK + 500, 0),
            ],
        );
        let store = Arc::new(FakeStore::default());

        let report = indexer(chain, Arc::new(FakeResolver::default()), store.clone())
            .index_from_scratch()
            .await
            .unwrap();

        assert_eq!(report.profiles_written, 1);

        let inserted = store.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(
            inserted[0].emitted_block_number,
            (DEPLOY_BLOCK + 500) as i64
        );
    }

    #[tokio::test]
    async fn unresolvable_name_is_recorded_not_fatal() {
        let chain = FakeChain::new(
            DEPLOY_BLOCK + 1_000,
            vec![
                encoded_registration_log("alice", DEPLOY_BLOCK + 100, 0),
                encoded_registration_log("ghost", DEPLOY_BLOCK + 200, 0),
            ],
        );
        let resolver = Arc::new(FakeResolver {
            not_found: HashSet::from(["ghost.eth".to_string()]),
        });
        let store = Arc::new(FakeStore::default());

        let report = indexer(chain, resolver, store.clone())
            .index_from_scratch()
            .await
            .unwrap();

        assert_eq!(report.profiles_written, 1);
        assert_eq!(report.fails, vec!["ghost.eth".to_string()]);

        let metadata = store.metadata.lock().unwrap();
        assert_eq!(metadata[0].fails, vec!["ghost.eth".to_string()]);
    }

    #[tokio::test]
    async fn incremental_run_upserts() {
        let chain = FakeChain::new(
            DEPLOY_BLOCK + 1_000,
            vec![encoded_registration_log("alice", DEPLOY_BLOCK + 100, 0)],
        );
        let store = Arc::new(FakeStore::default());
        let indexer = indexer(chain, Arc::new(FakeResolver::default()), store.clone());

        indexer.index_from_block(DEPLOY_BLOCK).await.unwrap();
        indexer.index_from_block(DEPLOY_BLOCK).await.unwrap();

        let upserted = store.upserted.lock().unwrap();
        assert_eq!(upserted.len(), 1);
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_sync_resumes_past_watermark() {
        let watermark = DEPLOY_BLOCK + 4_000;
        let chain = FakeChain::new(
            DEPLOY_BLOCK + 6_000,
            vec![encoded_registration_log("bob", watermark + 50, 0)],
        );
        let store = Arc::new(FakeStore::default());
        store
            .metadata
            .lock()
            .unwrap()
            .push(SyncMetadata::new(watermark as i64, vec![]));

        let report = indexer(chain.clone(), Arc::new(FakeResolver::default()), store)
            .index_from_last_sync()
            .await
            .unwrap();

        assert_eq!(report.profiles_written, 1);
        let requested = chain.requested.lock().unwrap();
        assert!(requested.iter().all(|&(from, _)| from > watermark));
        assert_eq!(requested.first().unwrap().0, watermark + 1);
    }

    #[tokio::test]
    async fn resume_at_tip_indexes_tip_block_events() {
        let tip = DEPLOY_BLOCK + 2_000;
        let chain = FakeChain::new(tip, vec![encoded_registration_log("carol", tip, 0)]);
        let store = Arc::new(FakeStore::default());
        store
            .metadata
            .lock()
            .unwrap()
            .push(SyncMetadata::new((tip - 1) as i64, vec![]));

        let report = indexer(
            chain.clone(),
            Arc::new(FakeResolver::default()),
            store.clone(),
        )
        .index_from_last_sync()
        .await
        .unwrap();

        assert_eq!(report.profiles_written, 1);
        assert_eq!(report.last_block_number, tip as i64);
        assert_eq!(*chain.requested.lock().unwrap(), vec![(tip, tip)]);
        assert_eq!(store.upserted.lock().unwrap()[0].ens_name, "carol.eth");
    }

    #[tokio::test]
    async fn caught_up_resume_holds_the_watermark() {
        let tip = DEPLOY_BLOCK + 2_000;
        let chain = FakeChain::new(tip, vec![]);
        let store = Arc::new(FakeStore::default());
        store
            .metadata
            .lock()
            .unwrap()
            .push(SyncMetadata::new(tip as i64, vec![]));

        let report = indexer(
            chain.clone(),
            Arc::new(FakeResolver::default()),
            store.clone(),
        )
        .index_from_last_sync()
        .await
        .unwrap();

        assert_eq!(report.profiles_written, 0);
        assert_eq!(report.last_block_number, tip as i64);
        assert!(chain.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_sync_without_history_fails() {
        let chain = FakeChain::new(DEPLOY_BLOCK + 1_000, vec![]);
        let store = Arc::new(FakeStore::default());

        let result = indexer(chain, Arc::new(FakeResolver::default()), store)
            .index_from_last_sync()
            .await;

        assert!(matches!(result, Err(IndexError::NoWatermark)));
    }

    #[tokio::test]
    async fn empty_range_still_advances_watermark() {
        let tip = DEPLOY_BLOCK + 3_000;
        let chain = FakeChain::new(tip, vec![]);
        let store = Arc::new(FakeStore::default());

        let report = indexer(chain, Arc::new(FakeResolver::default()), store.clone())
            .index_from_block(DEPLOY_BLOCK)
            .await
            .unwrap();

        assert_eq!(report.profiles_written, 0);
        assert_eq!(report.last_block_number, tip as i64);
        assert_eq!(
            store.metadata.lock().unwrap()[0].last_block_number,
            tip as i64
        );
    }

    #[tokio::test]
    async fn persistence_failure_aborts_the_run() {
        let chain = FakeChain::new(
            DEPLOY_BLOCK + 1_000,
            vec![encoded_registration_log("alice", DEPLOY_BLOCK + 100, 0)],
        );
        let store = Arc::new(FakeStore {
            fail_writes: true,
            ..FakeStore::default()
        });

        let result = indexer(chain, Arc::new(FakeResolver::default()), store.clone())
            .index_from_scratch()
            .await;

        match result {
            Err(IndexError::Stage { stage, .. }) => assert!(matches!(stage, Stage::Persist)),
            other => panic!("expected persist error, got {other:?}"),
        }
        assert!(store.metadata.lock().unwrap().is_empty());
    }
}
