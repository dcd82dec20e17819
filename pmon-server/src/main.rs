//! pmon server
//!
//! Watches prediction-market wallets: ingests the real-time feed, persists
//! normalized records and turns threshold crossings into notifications.

mod config;
mod notifier;
mod server;
mod shutdown;
mod state;
mod workers;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use notifier::TriggerNotifier;
use pmon_core::config::ConfigStore;
use pmon_core::events::{adapter_event_channel, notification_trigger_channel};
use pmon_core::processors::{EventPipeline, RealTimeIngestionAdapter, WebSocketConnector};
use pmon_core::storage::{EventStore, MemoryEventStore, PgEventStore};
use server::{build_router, run_server};
use shutdown::{shutdown_signal, spawn_config_reload_handler};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use workers::EventWorkers;

/// pmon - prediction-market wallet monitor
#[derive(Parser, Debug)]
#[command(name = "pmon-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./pmon-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Keep records in memory instead of Postgres
    #[arg(long, default_value = "false")]
    in_memory: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "PMON_LOG_JSON", default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_json);

    tracing::info!("Starting pmon-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Choose the record store
    let (store, db_pool) = if args.in_memory {
        tracing::warn!("Using the in-memory store, records are lost on exit");
        let store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
        (store, None)
    } else {
        let database_url = get_database_url().map_err(|e| {
            tracing::error!("DATABASE_URL environment variable not set");
            e
        })?;

        tracing::info!("Connecting to database...");
        let db_pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&database_url)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to database: {}", e);
                e
            })?;
        tracing::info!("Database connection established");

        if args.migrate {
            tracing::info!("Running database migrations...");
            sqlx::migrate!("../migrations")
                .run(&db_pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to run migrations: {}", e);
                    e
                })?;
            tracing::info!("Migrations completed successfully");
        }

        let store: Arc<dyn EventStore> = Arc::new(PgEventStore::new(db_pool.clone()));
        (store, Some(db_pool))
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let thresholds = ConfigStore::new(loaded_config.thresholds);

    // Notification sink, stopped only after the pipeline drained
    let (trigger_tx, trigger_rx) = notification_trigger_channel();
    let (notifier_stop_tx, notifier_stop_rx) = watch::channel(false);
    let notifier = TriggerNotifier::new(trigger_rx, loaded_config.notifications)?;
    let notifier_task = tokio::spawn(notifier.run(notifier_stop_rx));

    // Pipeline
    let pipeline = EventPipeline::new(
        loaded_config.pipeline,
        loaded_config.retry,
        thresholds.clone(),
        store,
        trigger_tx,
    );

    // Ingestion: adapter -> router -> pipeline
    let (adapter_tx, adapter_rx) = adapter_event_channel();
    let mut workers = EventWorkers::spawn(pipeline.clone(), adapter_rx, shutdown_rx.clone());
    if loaded_config.feed_enabled {
        let connector = WebSocketConnector::from_config(&loaded_config.ingestion);
        let adapter = RealTimeIngestionAdapter::new(connector, loaded_config.ingestion, adapter_tx);
        workers.add_feed_task(tokio::spawn(adapter.run(shutdown_rx.clone())));
    } else {
        tracing::warn!("Real-time feed disabled");
        drop(adapter_tx);
    }

    // Spawn config reload handler (listens for SIGHUP)
    let reload_task = spawn_config_reload_handler(config_loader, thresholds, shutdown_rx.clone());

    // Run the HTTP server until SIGINT/SIGTERM
    let router = build_router(AppState::new(pipeline));
    let listen_addr = loaded_config.server.listen;
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr, shutdown_signal()).await;

    // Stop producers first, then let the pipeline drain
    let _ = shutdown_tx.send(true);
    workers.join().await;
    let _ = notifier_stop_tx.send(true);
    let _ = notifier_task.await;
    let _ = reload_task.await;

    if let Some(db_pool) = db_pool {
        tracing::info!("Closing database connections...");
        db_pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
