//! `ClawHQ` Hub Server
//!
//! HTTP hub where agents register, authenticate, and report status and tasks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clawhq_core::config::{ThrottleBackend, load_config};
use clawhq_core::db::unix_timestamp;
use clawhq_core::tracing_init::{default_filter, init_tracing};
use tracing::{info, warn};

use clawhq_server::http::{AppState, build_router};
use clawhq_server::storage::HubDatabase;
use clawhq_server::throttle::{BucketStore, MemoryBucketStore};

#[derive(Parser, Debug)]
#[command(name = "clawhq-server")]
#[command(version, about = "ClawHQ hub - agent registration and telemetry API")]
struct Args {
    /// Path to a TOML config file.
    #[arg(long, env = "CLAWHQ_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file (overrides config).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Externally visible base URL used in generated links.
    #[arg(long)]
    public_url: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.listen_addr = addr;
    }
    if let Some(path) = args.db_path {
        config.server.database_path = Some(path);
    }
    if let Some(url) = args.public_url {
        config.server.public_url = Some(url);
    }

    init_tracing(
        &default_filter("clawhq_server", &config.server.log_level),
        args.log_json,
    );

    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.listen_addr,
        "Starting clawhq-server"
    );

    let db_path = config
        .database_path()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine database path; pass --db-path"))?;
    info!(path = %db_path.display(), "Opening hub database");
    let db = HubDatabase::open(&db_path).await?;

    match db.purge_expired_buckets(unix_timestamp()).await {
        Ok(removed) if removed > 0 => info!(removed, "Purged expired throttle buckets"),
        Err(e) => warn!(error = %e, "Throttle bucket purge failed"),
        _ => {}
    }

    let buckets: Arc<dyn BucketStore> = match config.registration.throttle_backend {
        ThrottleBackend::Sqlite => Arc::new(db.clone()),
        ThrottleBackend::Memory => {
            info!("Using in-process throttle buckets");
            Arc::new(MemoryBucketStore::new())
        }
    };

    let state = AppState::new(db, buckets, &config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    info!(addr = %config.server.listen_addr, "Hub listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
        }
    })
    .await?;

    info!("Hub stopped");
    Ok(())
}
