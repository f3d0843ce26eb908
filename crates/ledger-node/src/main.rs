mod api;
mod client;
mod constants;

use anyhow::Context;
use api::AppState;
use clap::Parser;
use client::HttpPeerClient;
use constants::{DEFAULT_LISTEN, DEFAULT_PEER_TIMEOUT_MS};
use ledger_core::{
    constants::DEFAULT_DIFFICULTY,
    node::{Node, NodeConfig},
};
use ledger_storage::{json_store::JsonFileStore, sled_store::SledStore, DumpStore};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::signal;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// URL peers use to reach this node (defaults to http://<listen>)
    #[arg(long)]
    public_url: Option<String>,

    /// Leading zero hex digits required of each block hash
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Timeout for any single call to a peer, in milliseconds
    #[arg(long, default_value_t = DEFAULT_PEER_TIMEOUT_MS)]
    peer_timeout_ms: u64,

    /// JSON chain dump read at startup and written at shutdown
    #[arg(long, env = "DATA_FILE")]
    data_file: Option<PathBuf>,

    /// Keep the chain dump in a sled database instead of a JSON file
    #[arg(long, conflicts_with = "data_file")]
    sled_dir: Option<PathBuf>,

    /// Register with this node once started
    #[arg(long)]
    bootstrap: Option<String>,
}

fn open_store(args: &Args) -> anyhow::Result<Option<Box<dyn DumpStore>>> {
    if let Some(path) = &args.data_file {
        return Ok(Some(Box::new(JsonFileStore::new(path))));
    }
    if let Some(dir) = &args.sled_dir {
        let store = SledStore::open(dir).with_context(|| format!("opening {}", dir.display()))?;
        return Ok(Some(Box::new(store)));
    }
    Ok(None)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("cannot listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = NodeConfig {
        difficulty: args.difficulty,
        peer_timeout: Duration::from_millis(args.peer_timeout_ms),
    };
    let public_url = args
        .public_url
        .clone()
        .unwrap_or_else(|| format!("http://{}", args.listen));
    let node = Arc::new(Node::new(&public_url, config.clone()));

    let store = open_store(&args)?;
    if let Some(store) = &store {
        if let Some(dump) = store.load()? {
            node.import(dump).await.context("adopting saved chain")?;
            info!("restored chain of {} blocks", node.chain_len().await);
        }
    }

    let client = HttpPeerClient::new(config.peer_timeout)?;
    if let Some(remote) = &args.bootstrap {
        if let Err(e) = node.register_with(&client, remote).await {
            warn!("bootstrap via {remote} failed: {e}");
        }
    }

    let app = api::router(AppState {
        node: Arc::clone(&node),
        client,
    });

    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr} as {}", node.address());
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(store) = &store {
        store.save(&node.chain_snapshot().await)?;
    }
    Ok(())
}
