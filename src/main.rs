//! Refsync binary: runs the reference-data synchronization service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use refsync::adapter::{BinanceAdapter, OkxAdapter, SymbolFilter};
use refsync::config::{init_logging, Config};
use refsync::notify::{LogNotifier, NotifierRegistry};
use refsync::port::adapter::ExchangeAdapter;
use refsync::port::store::GenerationStore;
use refsync::reconcile::Reconciler;
use refsync::resolver::SymbolResolver;
use refsync::scheduler::Poller;
use refsync::store::db::{create_pool, run_migrations};
use refsync::store::SqliteStore;

#[derive(Parser)]
#[command(name = "refsync", about = "Multi-exchange reference-data synchronization", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "refsync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the synchronization service until interrupted.
    Run,
    /// Validate the configuration and exit.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    match cli.command {
        Command::Check => {
            println!("config ok: {} exchange(s) enabled", config.enabled_exchanges().len());
            Ok(())
        }
        Command::Run => run(config).await,
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    init_logging(&config.logging);

    let pool = create_pool(&config.store.database).context("opening database")?;
    run_migrations(&pool).context("running migrations")?;
    let store = Arc::new(
        SqliteStore::open(pool, config.store.retention_policy()).context("restoring store")?,
    );
    info!(database = %config.store.database, "Database initialized");

    let mut notifiers = NotifierRegistry::new();
    notifiers.register(Box::new(LogNotifier));
    let notifiers = Arc::new(notifiers);

    let resolver = Arc::new(SymbolResolver::new());
    let reconciler = Arc::new(Reconciler::new(Arc::clone(&store), Arc::clone(&notifiers)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::new();

    for (name, exchange_config) in &config.exchanges {
        if !exchange_config.enabled {
            continue;
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(exchange_config.request_timeout_secs))
            .build()
            .context("building http client")?;
        let filter = SymbolFilter::new(&exchange_config.symbols);

        let adapter: Arc<dyn ExchangeAdapter> = match name.as_str() {
            "binance" => Arc::new(BinanceAdapter::new(client, filter)),
            "okx" => Arc::new(OkxAdapter::new(client, filter)),
            other => {
                anyhow::bail!("unknown exchange '{other}' in config");
            }
        };

        let poller = Poller::new(
            adapter,
            Arc::clone(&resolver),
            Arc::clone(&reconciler),
            Arc::clone(&notifiers),
            config.poller_config(exchange_config),
        );
        handles.push(poller.spawn(shutdown_rx.clone()));
        info!(exchange = name, "Poller spawned");
    }

    if handles.is_empty() {
        anyhow::bail!("no exchanges enabled in config");
    }

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    for handle in handles {
        let _ = handle.await;
    }
    info!(generation = %store.active().id, "Shutdown complete");

    Ok(())
}
