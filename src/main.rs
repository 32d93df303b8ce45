use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use points_ledger::api::{self, AppState};
use points_ledger::config::{Cli, Command, ServerConfig};
use points_ledger::csv::{read_operations, write_balances};
use points_ledger::{Ledger, MemoryStore, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve(config) => serve(config).await,
        Command::Replay { path } => replay(path).await,
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let store = SqliteStore::open(&config.database)
        .with_context(|| format!("opening ledger database {}", config.database.display()))?;
    let ledger = Arc::new(Ledger::new(store));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for shutdown signal: {e}");
        }
    };
    api::serve(config.addr(), AppState::new(ledger.clone()), shutdown)
        .await
        .context("serving http api")?;

    info!("shutting down");
    match Arc::try_unwrap(ledger) {
        Ok(ledger) => ledger.close().context("closing ledger database")?,
        Err(_) => warn!("ledger still in use at shutdown, leaving database to drop"),
    }
    Ok(())
}

async fn replay(path: PathBuf) -> anyhow::Result<()> {
    if path.extension().is_none_or(|ext| ext != "csv") {
        warn!(path = %path.display(), "input file seems to not be a csv file");
    }

    let operations = read_operations(path)?;
    let ledger = Ledger::new(MemoryStore::new());
    let (op_sender, op_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in operations {
            match result {
                Ok(op) => {
                    if op_sender.send(op).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    ledger.run(ReceiverStream::new(op_receiver)).await;

    write_balances(&ledger.balances()?, io::stdout().lock())?;
    Ok(())
}
