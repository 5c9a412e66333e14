//! Drives event lists through profile resolution in small concurrent
//! groups, isolating per-item failures.
//!
//! Each resolution fans out into many contract reads, so groups are kept
//! small and the orchestrator pauses between them to stay under provider
//! rate limits. A name that cannot be resolved lands in the fail list;
//! it never aborts the batch.

use std::time::Duration;

use futures::future::join_all;
use log::{info, warn};

use crate::db::models::{EventLog, Profile, RegistrationEvent};
use crate::error::ResolveError;
use crate::resolver::ResolveProfile;

/// Tunables for batched resolution.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Events resolved concurrently per group. Small on purpose; every
    /// resolution issues many sub-queries.
    pub group_size: usize,
    /// Attempts per event on transient errors.
    pub max_attempts: u32,
    /// First retry delay; doubles each attempt.
    pub retry_base_delay: Duration,
    /// Backoff ceiling.
    pub retry_max_delay: Duration,
    /// Pause between groups.
    pub inter_group_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            group_size: 3,
            max_attempts: 3,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(10),
            inter_group_delay: Duration::from_secs(1),
        }
    }
}

/// Successes in arrival order plus the names that failed. Failures are
/// returned, never thrown.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub profiles: Vec<Profile>,
    pub fails: Vec<String>,
}

/// Outcome of one event's resolution; folded into a [`BatchOutcome`]
/// after the group completes, so no accumulator is mutated from inside
/// concurrent callbacks.
enum Resolution {
    Resolved(Profile),
    Failed(String),
}

pub struct BatchOrchestrator<R> {
    resolver: R,
    config: OrchestratorConfig,
}

impl<R: ResolveProfile> BatchOrchestrator<R> {
    pub fn new(resolver: R, config: OrchestratorConfig) -> Self {
        Self { resolver, config }
    }

    /// Resolve an ordered list of event logs into profiles and a fail
    /// list. Individual failures never raise.
    pub async fn resolve_all(&self, logs: &[EventLog]) -> BatchOutcome {
        info!("Resolving {} registration events", logs.len());

        let mut outcome = BatchOutcome::default();
        let group_count = logs.chunks(self.config.group_size).count();

        for (i, group) in logs.chunks(self.config.group_size).enumerate() {
            let resolutions = join_all(group.iter().map(|log| self.resolve_one(log))).await;

            for resolution in resolutions {
                match resolution {
                    Resolution::Resolved(profile) => outcome.profiles.push(profile),
                    Resolution::Failed(name) => outcome.fails.push(name),
                }
            }

            if i + 1 < group_count {
                tokio::time::sleep(self.config.inter_group_delay).await;
            }
        }

        info!(
            "Resolved {} profiles, {} failures",
            outcome.profiles.len(),
            outcome.fails.len()
        );
        outcome
    }

    /// One event's resolution with bounded retry. `NotFound` and
    /// validation errors are terminal for the name; transient errors are
    /// retried with capped backoff and recorded on exhaustion.
    async fn resolve_one(&self, log: &EventLog) -> Resolution {
        let event = match RegistrationEvent::decode(log) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping undecodable log: {e:#}");
                return Resolution::Failed(format!("<undecoded log at block {}>", log.block_number));
            },
        };

        let mut delay = self.config.retry_base_delay;

        for attempt in 1..=self.config.max_attempts {
            match self.resolver.resolve(&event).await {
                Ok(profile) => return Resolution::Resolved(profile),
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    warn!(
                        "Resolving {} failed (attempt {attempt}/{}), retrying in {delay:?}: {e:#}",
                        event.name, self.config.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.retry_max_delay);
                },
                Err(ResolveError::NotFound(name)) => {
                    info!("No resolver for {name}, recording failure");
                    return Resolution::Failed(name);
                },
                Err(ResolveError::Validation { name, reason }) => {
                    warn!("Profile for {name} failed validation: {reason}");
                    return Resolution::Failed(name);
                },
                Err(e) => {
                    warn!("Resolving {} exhausted retries: {e:#}", event.name);
                    return Resolution::Failed(event.name.clone());
                },
            }
        }

        // Loop always returns within max_attempts iterations.
        Resolution::Failed(event.name)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::db::models::{encoded_registration_log, sample_profile};

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig {
            group_size: 3,
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(4),
            inter_group_delay: Duration::from_millis(1),
        }
    }

    /// Scripted resolver: per-name behavior plus a default of success.
    enum Behavior {
        NotFound,
        /// Fail transiently this many times before succeeding.
        Flaky(AtomicU32),
        AlwaysTransient,
    }

    #[derive(Default)]
    struct FakeResolver {
        behaviors: HashMap<String, Behavior>,
    }

    impl FakeResolver {
        fn with(mut self, name: &str, behavior: Behavior) -> Self {
            self.behaviors.insert(name.to_string(), behavior);
            self
        }
    }

    #[async_trait]
    impl ResolveProfile for Arc<FakeResolver> {
        async fn resolve(&self, event: &RegistrationEvent) -> Result<Profile, ResolveError> {
            match self.behaviors.get(&event.name) {
                Some(Behavior::NotFound) => Err(ResolveError::NotFound(event.name.clone())),
                Some(Behavior::Flaky(left)) => {
                    if left
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                        .is_ok()
                    {
                        Err(ResolveError::Transient(anyhow::anyhow!("429")))
                    } else {
                        Ok(sample_profile(&event.name, event.block_number as i64))
                    }
                },
                Some(Behavior::AlwaysTransient) => {
                    Err(ResolveError::Transient(anyhow::anyhow!("429")))
                },
                None => Ok(sample_profile(&event.name, event.block_number as i64)),
            }
        }
    }

    fn logs_for(labels: &[&str]) -> Vec<EventLog> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| encoded_registration_log(label, 100 + i as u64, i as u64))
            .collect()
    }

    #[tokio::test]
    async fn one_bad_name_does_not_abort_the_batch() {
        let resolver = Arc::new(FakeResolver::default().with("bob.eth", Behavior::NotFound));
        let orchestrator = BatchOrchestrator::new(resolver, fast_config());

        let logs = logs_for(&["alice", "bob", "carol", "dave", "erin"]);
        let outcome = orchestrator.resolve_all(&logs).await;

        assert_eq!(outcome.profiles.len(), 4);
        assert_eq!(outcome.fails, vec!["bob.eth".to_string()]);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_to_success() {
        let resolver =
            Arc::new(FakeResolver::default().with("alice.eth", Behavior::Flaky(AtomicU32::new(2))));
        let orchestrator = BatchOrchestrator::new(resolver, fast_config());

        let outcome = orchestrator.resolve_all(&logs_for(&["alice"])).await;

        assert_eq!(outcome.profiles.len(), 1);
        assert!(outcome.fails.is_empty());
    }

    #[tokio::test]
    async fn retry_exhaustion_lands_in_fails() {
        let resolver =
            Arc::new(FakeResolver::default().with("alice.eth", Behavior::AlwaysTransient));
        let orchestrator = BatchOrchestrator::new(resolver, fast_config());

        let outcome = orchestrator.resolve_all(&logs_for(&["alice", "bob"])).await;

        assert_eq!(outcome.profiles.len(), 1);
        assert_eq!(outcome.fails, vec!["alice.eth".to_string()]);
    }

    #[tokio::test]
    async fn empty_input_resolves_to_empty_outcome() {
        let resolver = Arc::new(FakeResolver::default());
        let orchestrator = BatchOrchestrator::new(resolver, fast_config());

        let outcome = orchestrator.resolve_all(&[]).await;
        assert!(outcome.profiles.is_empty());
        assert!(outcome.fails.is_empty());
    }
}
