//! pg-relay: stream PostgreSQL logical replication changes as JSON events.
//!
//! Provisions a publication and a replication slot, polls the slot for
//! changes and prints one structured change event per line. Supports both
//! the binary pgoutput plugin (decoded by `pg-relay-pgoutput`) and the
//! wal2json plugin (normalized by `pg-relay-wal2json`); both produce the
//! same event shape.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pg_relay_pgoutput::ChangeDecoder;
use pg_relay_replication::{compare_lsn, Client, Config, Slot};
use tokio_postgres::NoTls;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Plugin {
    /// Binary pgoutput messages, decoded locally.
    Pgoutput,
    /// wal2json JSON records, normalized into the same event shape.
    Wal2json,
}

impl Plugin {
    fn slot_plugin(self) -> &'static str {
        match self {
            Plugin::Pgoutput => "pgoutput",
            Plugin::Wal2json => "wal2json",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "pg-relay", about = "Stream PostgreSQL changes as JSON events")]
struct Args {
    /// PostgreSQL connection string
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "host=localhost user=postgres password=postgres dbname=postgres"
    )]
    connection_string: String,

    /// Replication slot name
    #[arg(long, env = "SLOT_NAME", default_value = "pg_relay_slot")]
    slot: String,

    /// Publication name (pgoutput only)
    #[arg(long, env = "PUBLICATION", default_value = "pg_relay_pub")]
    publication: String,

    /// Comma-separated tables to publish (default: all tables)
    #[arg(long, env = "TABLES", value_delimiter = ',')]
    tables: Vec<String>,

    /// Logical decoding output plugin
    #[arg(long, value_enum, default_value = "pgoutput")]
    plugin: Plugin,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Stop once the slot has been advanced to this LSN (e.g. "0/1949850")
    #[arg(long)]
    until_lsn: Option<String>,

    /// Drop the replication slot on shutdown
    #[arg(long)]
    drop_slot: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pg_relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::new(
        &args.connection_string,
        args.slot.clone(),
        args.publication.clone(),
    )
    .context("Failed to parse connection string")?;
    config.tables = args.tables.clone();

    info!("Connecting to PostgreSQL...");
    let (pg_client, connection) = config
        .postgres_config
        .connect(NoTls)
        .await
        .context("Failed to connect to PostgreSQL")?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("Connection error: {e}");
        }
    });

    if config.tables.is_empty() {
        info!("Publishing changes for all tables");
    } else {
        info!("Publishing changes for tables: {:?}", config.tables);
    }

    let client = Client::new(pg_client, config);
    if args.plugin == Plugin::Pgoutput {
        client.create_publication().await?;
    }
    client.create_slot(args.plugin.slot_plugin()).await?;
    let slot = client.start_replication().await?;

    info!(
        "Replication started on slot {} ({})",
        slot.slot_name(),
        args.plugin.slot_plugin()
    );

    let shutdown = setup_shutdown_handler();
    stream_changes(
        &slot,
        args.plugin,
        args.interval_ms,
        args.until_lsn.as_deref(),
        shutdown,
    )
    .await?;

    info!("Shutting down...");
    if args.drop_slot {
        match client.drop_slot().await {
            Ok(_) => info!("Replication slot dropped"),
            Err(e) => warn!("Failed to drop replication slot: {}", e),
        }
    }

    Ok(())
}

/// Polls the slot and prints one JSON event per line until shutdown.
async fn stream_changes(
    slot: &Slot,
    plugin: Plugin,
    interval_ms: u64,
    until_lsn: Option<&str>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> Result<()> {
    // Fresh session: forget any schema learned on a previous connection,
    // relation identifiers are not stable across sessions.
    let mut decoder = ChangeDecoder::new();
    decoder.reset();

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Received shutdown signal");
                break;
            }
            _ = tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)) => {
                let advanced_to = match plugin {
                    Plugin::Pgoutput => poll_pgoutput(slot, &mut decoder).await,
                    Plugin::Wal2json => poll_wal2json(slot).await,
                };

                match advanced_to {
                    Ok(Some(last_lsn)) => {
                        // Acknowledge only after the whole batch printed, so
                        // a crash redelivers instead of losing changes.
                        if let Err(e) = slot.advance(&last_lsn).await {
                            error!(
                                "Failed to advance slot to {}: {}. Changes will be redelivered.",
                                last_lsn, e
                            );
                        }
                        if let Some(target) = until_lsn {
                            if compare_lsn(&last_lsn, target) >= 0 {
                                info!("Reached target LSN {} (current: {})", target, last_lsn);
                                break;
                            }
                        }
                    }
                    Ok(None) => debug!("No new changes available"),
                    Err(e) => {
                        error!("Error polling slot: {}", e);
                        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Decodes and prints a batch of binary pgoutput messages. Returns the
/// last LSN of the batch, if any.
async fn poll_pgoutput(slot: &Slot, decoder: &mut ChangeDecoder) -> Result<Option<String>> {
    let changes = slot.peek().await?;
    let mut last_lsn = None;
    for (lsn, buffer) in changes {
        let event = decoder.decode(&buffer);
        println!("{}", serde_json::to_string(&event)?);
        last_lsn = Some(lsn);
    }
    Ok(last_lsn)
}

/// Normalizes and prints a batch of wal2json records. Returns the last
/// LSN of the batch, if any.
async fn poll_wal2json(slot: &Slot) -> Result<Option<String>> {
    let changes = slot.peek_wal2json().await?;
    let mut last_lsn = None;
    for (lsn, record) in changes {
        for event in pg_relay_wal2json::normalize(&record)? {
            println!("{}", serde_json::to_string(&event)?);
        }
        last_lsn = Some(lsn);
    }
    Ok(last_lsn)
}

/// Sets up a shutdown signal handler.
fn setup_shutdown_handler() -> tokio::sync::broadcast::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");

        info!("Received interrupt signal (Ctrl+C)");
        let _ = shutdown_tx.send(());
    });

    shutdown_rx
}
