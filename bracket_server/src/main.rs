//! Tournament bracket server.
//!
//! Serves the bracket engine over HTTP, backed by PostgreSQL or an
//! in-memory repository.

use anyhow::{Context, Error};
use bracket_server::{
    api,
    config::{CliOverrides, ServerConfig, Storage},
    logging, metrics,
};
use bracket_engine::db::Database;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use tokio::sync::watch;

const HELP: &str = "\
Run the tournament bracket server

USAGE:
  bracket_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --storage    KIND        memory or postgres          [default: env STORAGE or memory]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STORAGE                  Storage backend
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Pool size and timeouts, see DatabaseConfig
  METRICS_BIND             Prometheus listener address (disabled when unset)
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = CliOverrides {
        bind: pargs.opt_value_from_str("--bind")?,
        storage: pargs.opt_value_from_str("--storage")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };
    let config = ServerConfig::from_env(overrides)?;

    // Ctrl+C and SIGTERM trigger a graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    logging::init();
    info!("Starting bracket server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).context("Failed to install Prometheus exporter")?;
        info!("Metrics available at http://{}/metrics", addr);
    }

    let state = match &config.storage {
        Storage::Memory => {
            info!("Using in-memory storage; state is lost on shutdown");
            api::AppState::in_memory()
        }
        Storage::Postgres(db_config) => {
            info!("Connecting to database");
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.ensure_schema()
                .await
                .context("Failed to prepare database schema")?;
            info!("Database connected successfully");
            api::AppState::postgres(db)
        }
    };

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{} ({} storage). Press Ctrl+C to stop.",
        config.bind,
        config.storage.name()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    Ok(())
}

/// Resolves once the signal handler fires
async fn shutdown_signal(mut stop: watch::Receiver<bool>) {
    let fired = stop.wait_for(|stopping| *stopping).await.is_ok();
    if !fired {
        // Handler dropped without firing; keep serving
        std::future::pending::<()>().await;
    }
}
