//! Narrow boundary to the blockchain RPC provider.
//!
//! The fetcher only needs the chain height and registration logs for a
//! block range, so that is all the trait exposes. Tests substitute a fake;
//! production uses an alloy HTTP provider.

use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::Filter;
use alloy::sol_types::SolEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use url::Url;

use crate::abis::{IETHRegistrarController::NameRegistered, ETH_REGISTRAR_CONTROLLER};
use crate::db::models::EventLog;

/// Chain access needed by the range log fetcher.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current chain height.
    async fn block_number(&self) -> Result<u64>;

    /// All `NameRegistered` logs emitted by the controller in
    /// `[from_block, to_block]` (inclusive).
    async fn registration_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<EventLog>>;
}

/// `ChainClient` over an alloy HTTP provider.
pub struct RpcChainClient {
    provider: DynProvider,
    controller: Address,
}

impl RpcChainClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = Url::parse(rpc_url).context("Invalid RPC URL")?;
        let client = ProviderBuilder::new().connect_http(url);
        let provider = DynProvider::new(client);

        let controller = ETH_REGISTRAR_CONTROLLER
            .parse()
            .context("Invalid controller address")?;

        Ok(Self {
            provider,
            controller,
        })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("eth_blockNumber failed")
    }

    async fn registration_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<EventLog>> {
        let filter = Filter::new()
            .address(self.controller)
            .event_signature(NameRegistered::SIGNATURE_HASH)
            .from_block(from_block)
            .to_block(to_block);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .with_context(|| format!("eth_getLogs failed for [{from_block}, {to_block}]"))?;

        logs.into_iter()
            .map(|log| {
                let block_number = log
                    .block_number
                    .context("log is missing its block number")?;
                Ok(EventLog {
                    address: log.inner.address,
                    data: log.inner.data,
                    block_number,
                    // Ties within a block are broken by log index.
                    log_index: log.log_index.unwrap_or(0),
                })
            })
            .collect()
    }
}
