//! Batched historical log retrieval under provider rate limits.
//!
//! A fetch partitions the requested block range into fixed-size sub-ranges
//! (the provider caps the block span of a single `eth_getLogs` call),
//! issues them concurrently in bounded batches, retries each sub-query
//! with capped exponential backoff and pauses between batches to keep the
//! burst rate down. Results are concatenated and globally sorted, so
//! concurrent issuance never produces unordered output.

use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use log::{debug, info, warn};

use crate::db::models::EventLog;
use crate::error::IndexError;
use crate::rpc::ChainClient;

/// Tunables for the range log fetcher. Bounds are fixed constants, not
/// derived from system resources.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Provider-imposed maximum block span per `eth_getLogs` query.
    pub query_span: u64,
    /// Sub-range queries in flight at once.
    pub batch_size: usize,
    /// First retry delay; doubles each attempt.
    pub retry_base_delay: Duration,
    /// Backoff ceiling.
    pub retry_max_delay: Duration,
    /// Attempts per sub-range before the whole run fails as rate limited.
    pub max_attempts: u32,
    /// Pause between successive batches of sub-range queries.
    pub inter_batch_delay: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            query_span: 2_000,
            batch_size: 30,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            max_attempts: 8,
            inter_batch_delay: Duration::from_secs(5),
        }
    }
}

/// Logs for a block range together with the end block the fetch actually
/// covered. The end block becomes the watermark fallback when a run
/// resolves no profiles.
#[derive(Debug)]
pub struct FetchedLogs {
    pub logs: Vec<EventLog>,
    pub to_block: u64,
}

/// Retrieves registration-event logs for a block range as bounded
/// sub-range queries, tolerant of transient provider rate limiting.
pub struct RangeLogFetcher<C> {
    client: C,
    config: FetcherConfig,
}

impl<C: ChainClient> RangeLogFetcher<C> {
    pub fn new(client: C, config: FetcherConfig) -> Self {
        Self { client, config }
    }

    /// Fetch all registration logs in `[start_block, end_block]`, sorted
    /// ascending by `(block_number, log_index)`. `end_block` defaults to
    /// the chain height at call time.
    pub async fn fetch(
        &self,
        start_block: u64,
        end_block: Option<u64>,
    ) -> Result<FetchedLogs, IndexError> {
        let tip = match end_block {
            Some(block) => block,
            None => self
                .client
                .block_number()
                .await
                .map_err(IndexError::fetch)?,
        };

        if start_block > tip {
            // Report only blocks actually queried, so callers never
            // record a watermark past what was fetched.
            debug!("Start block {start_block} beyond tip {tip}, nothing to fetch");
            return Ok(FetchedLogs {
                logs: vec![],
                to_block: start_block.saturating_sub(1),
            });
        }

        info!("Fetching registration logs: blocks {start_block} -> {tip}");

        let sub_ranges = partition_range(start_block, tip, self.config.query_span);
        let mut logs: Vec<EventLog> = Vec::new();
        let batch_count = sub_ranges.chunks(self.config.batch_size).count();

        for (i, batch) in sub_ranges.chunks(self.config.batch_size).enumerate() {
            let queries = batch
                .iter()
                .map(|&(from, to)| self.query_with_backoff(from, to));

            for result in join_all(queries).await {
                logs.extend(result?);
            }

            // Smooth the request rate between batches.
            if i + 1 < batch_count {
                tokio::time::sleep(self.config.inter_batch_delay).await;
            }
        }

        logs.sort_by_key(|log| (log.block_number, log.log_index));

        info!("Fetched {} registration logs", logs.len());
        Ok(FetchedLogs {
            logs,
            to_block: tip,
        })
    }

    /// One sub-range query with capped exponential backoff. Rate limiting
    /// and transient network errors are indistinguishable at this layer;
    /// both are retried until the attempt budget runs out.
    async fn query_with_backoff(&self, from: u64, to: u64) -> Result<Vec<EventLog>, IndexError> {
        let mut delay = self.config.retry_base_delay;

        for attempt in 1..=self.config.max_attempts {
            match self.client.registration_logs(from, to).await {
                Ok(logs) => return Ok(logs),
                Err(e) => {
                    if attempt == self.config.max_attempts {
                        warn!("Sub-range [{from}, {to}] exhausted retries: {e:#}");
                        break;
                    }
                    warn!(
                        "Sub-range [{from}, {to}] failed (attempt {attempt}/{}), retrying in {delay:?}",
                        self.config.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.retry_max_delay);
                },
            }
        }

        Err(IndexError::RateLimited {
            attempts: self.config.max_attempts,
        })
    }
}

/// Partition `[start, end]` (inclusive) into non-overlapping sub-ranges of
/// at most `span` blocks, clipping the final one to `end`.
fn partition_range(start: u64, end: u64, span: u64) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    let mut from = start;

    while from <= end {
        let to = (from + span - 1).min(end);
        ranges.push((from, to));
        from = to + 1;
    }

    ranges
}
