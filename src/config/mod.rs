use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::abis::REGISTRAR_DEPLOY_BLOCK;

/// PostgreSQL connection configuration.
///
/// Used for storing:
/// - Resolved name profiles
/// - Indexing run metadata (watermark + fail lists)
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    16
}

/// RPC provider configuration.
///
/// The provider must serve `eth_blockNumber`, `eth_getLogs` and contract
/// reads for the registrar and resolver contracts.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderSettings {
    pub rpc_url: String,
    /// Block full backfills start from.
    #[serde(default = "default_deploy_block")]
    pub registrar_deploy_block: u64,
}

fn default_deploy_block() -> u64 {
    REGISTRAR_DEPLOY_BLOCK
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub postgres: PostgresSettings,
    pub provider: ProviderSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
