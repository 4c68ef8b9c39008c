use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use oracle_core::chain::{ChainClient, ChainEvent};
use oracle_core::ingester::Ingester;
use oracle_core::nodeset::NodeSetTracker;
use oracle_core::pipeline::{self, PipelineContext};
use oracle_core::scheduler::TokioScheduler;
use oracle_core::store::ContentStore;
use oracle_core::{logging, network, wallet, AppError};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Off-chain oracle node for a decentralized LLM inference coordination
/// contract.
#[derive(Debug, Parser)]
#[command(name = "llm-oracle-node")]
struct Cli {
    /// Network to connect to: mainnet, sepolia, or local.
    network: String,
}

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        error!(error = %e, "fatal startup error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let net = network::resolve(&cli.network)?;
    info!(network = net.name, rpc = %net.rpc, contract = %net.contract, "resolved network");

    let program_dir = program_dir()?;
    let config_dir = std::env::var("CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| program_dir.clone());
    let storage_dir = program_dir.join("storage-data");

    let (signer, address) = wallet::load_or_generate(&program_dir.join("account-evm.data"))
        .map_err(|e| AppError::Wallet(e.to_string()))?;
    info!(address = %address, "loaded node identity");

    let chain = Arc::new(ChainClient::connect(net.rpc, net.wss, net.contract, signer).await?);
    let store = Arc::new(ContentStore::new(storage_dir));
    let nodeset = Arc::new(NodeSetTracker::new(address));
    nodeset.refresh(&chain).await?;

    let scheduler = Arc::new(TokioScheduler);
    let pipeline_ctx = Arc::new(PipelineContext {
        chain: Arc::clone(&chain),
        store,
        nodeset: Arc::clone(&nodeset),
        scheduler,
        http: reqwest::Client::new(),
    });

    let ingester = Arc::new(Ingester::new(Arc::clone(&chain), &config_dir)?);
    let (tx, mut rx) = mpsc::channel::<ChainEvent>(1024);

    ingester.catch_up(&tx).await?;

    let live_ingester = Arc::clone(&ingester);
    let live_tx = tx.clone();
    tokio::spawn(async move {
        if let Err(e) = live_ingester.run_live(live_tx).await {
            error!(error = %e, "live log subscription ended");
        }
    });

    let heartbeat_ingester = Arc::clone(&ingester);
    tokio::spawn(async move {
        if let Err(e) = heartbeat_ingester.run_heartbeat().await {
            error!(error = %e, "heartbeat task ended");
        }
    });

    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(ChainEvent::NewRequest { request_id, redundancy }) => {
                        let ctx = Arc::clone(&pipeline_ctx);
                        tasks.spawn(async move { pipeline::run(ctx, request_id, redundancy).await });
                    }
                    Some(ChainEvent::NodeAdded { .. }) | Some(ChainEvent::NodeRemoved { .. }) => {
                        let nodeset = Arc::clone(&nodeset);
                        let chain = Arc::clone(&chain);
                        tokio::spawn(async move {
                            if let Err(e) = nodeset.refresh(&chain).await {
                                warn!(error = %e, "node-set refresh failed");
                            }
                        });
                    }
                    Some(_) => {} // Processed / ResultSubmitted are decoded but unused by this node.
                    None => {
                        warn!("event channel closed, shutting down");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received shutdown signal");
                break;
            }
            Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = result {
                    warn!(error = %e, "pipeline task panicked");
                }
            }
        }
    }

    tasks.shutdown().await;
    Ok(())
}

fn program_dir() -> Result<PathBuf, AppError> {
    let exe = std::env::current_exe()?;
    Ok(exe.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")))
}
