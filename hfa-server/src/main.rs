//! hfa-server - Membership and dues service for the academy
//!
//! Single binary: axum HTTP surface over the SQLite store, with a
//! session-guarded admin API and a public member-card lookup.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use hfa_common::db::{self, admins, SqliteStore};
use hfa_common::{config, Store};
use hfa_server::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "hfa-server", about = "Academy membership and dues service")]
struct Args {
    /// Data folder holding the SQLite database (falls back to
    /// HFA_DATA_FOLDER, then the config file, then the OS default)
    #[arg(long)]
    data_folder: Option<String>,

    /// Address to bind the HTTP server on
    #[arg(long, env = "HFA_BIND_ADDR", default_value = config::DEFAULT_BIND_ADDR)]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber first; everything after this logs
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting HFA membership service (hfa-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let data_folder = config::resolve_data_folder(args.data_folder.as_deref(), "HFA_DATA_FOLDER");
    let db_path = config::ensure_data_folder(&data_folder)?;
    info!("Database path: {}", db_path.display());

    let pool = match db::init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    // Startup maintenance: legacy rows get their derived code, dead
    // sessions go away. Both idempotent.
    let store = SqliteStore::new(pool.clone());
    let backfilled = store.backfill_academy_codes().await?;
    if backfilled > 0 {
        info!("Backfilled {} missing academy codes", backfilled);
    }
    let purged = admins::purge_expired_sessions(&pool).await?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    let state = AppState::new(pool);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!("hfa-server listening on http://{}", args.bind);
    info!("Health check: http://{}/health", args.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
