pub mod abis;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod indexer;
pub mod orchestrator;
pub mod resolver;
pub mod rpc;
pub mod utils;

pub use config::Settings;
pub use db::Database;
pub use error::{IndexError, ResolveError};
pub use indexer::{Indexer, RunReport};
pub use resolver::EnsProfileResolver;
pub use rpc::RpcChainClient;
