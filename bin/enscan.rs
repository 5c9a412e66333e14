use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use enscan::fetcher::FetcherConfig;
use enscan::orchestrator::OrchestratorConfig;
use enscan::{Database, EnsProfileResolver, Indexer, RpcChainClient, RunReport, Settings};

enum Command {
    Scratch,
    FromBlock(u64),
    LastSync,
}

fn parse_command() -> anyhow::Result<Command> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("scratch") => Ok(Command::Scratch),
        Some("from-block") => {
            let block = args
                .get(1)
                .context("Usage: enscan from-block <block-number>")?
                .parse::<u64>()
                .context("Block number must be a non-negative integer")?;
            Ok(Command::FromBlock(block))
        },
        Some("last-sync") => Ok(Command::LastSync),
        _ => anyhow::bail!("Usage: enscan <scratch | from-block <n> | last-sync>"),
    }
}

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    let command = parse_command()?;

    // Load configuration
    let settings = Arc::new(
        Settings::new()
            .context("Failed to load config.yaml. Please ensure it exists and is valid")?,
    );

    let db = Database::new(settings.clone())
        .await
        .context("Failed to initialize database connection")?;

    let client = RpcChainClient::new(&settings.provider.rpc_url)
        .context("Failed to initialize RPC client")?;
    let resolver = EnsProfileResolver::new(client.provider().clone())
        .context("Failed to initialize profile resolver")?;

    let indexer = Indexer::new(
        client,
        resolver,
        db,
        FetcherConfig::default(),
        OrchestratorConfig::default(),
        settings.provider.registrar_deploy_block,
    );

    let report = match command {
        Command::Scratch => indexer.index_from_scratch().await?,
        Command::FromBlock(block) => indexer.index_from_block(block).await?,
        Command::LastSync => indexer.index_from_last_sync().await?,
    };

    log_report(&report);
    Ok(())
}

fn log_report(report: &RunReport) {
    info!(
        "Indexing run finished: {} profiles written, watermark {}",
        report.profiles_written, report.last_block_number
    );
    if report.fails.is_empty() {
        info!("No resolution failures");
    } else {
        info!(
            "{} names failed to resolve: {}",
            report.fails.len(),
            report.fails.join(", ")
        );
    }
}
