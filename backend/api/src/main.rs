//! Cascade pot API — entry point.
//!
//! Serves the REST API over the settlement engine, backed by SQLite (or the
//! seeded in-memory store in demo mode), and runs a background scheduler
//! that rolls over recurring cycles past their end date.

mod api;
mod closing;
mod config;
mod db;
mod errors;
mod memory;
mod models;
mod scheduler;
mod store;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use db::SqliteStore;
use memory::MemStore;
use store::SharedStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Pick the storage backend behind the shared port.
    let store: SharedStore = if config.demo_mode {
        info!("DEMO_MODE set — serving the seeded in-memory store");
        Arc::new(MemStore::seeded(chrono::Utc::now().timestamp()))
    } else {
        Arc::new(SqliteStore::connect(&config.database_url).await?)
    };

    // ─── Background cycle scheduler ───────────────────────
    let scheduler_state = Arc::new(scheduler::SchedulerState {
        store: store.clone(),
        poll_interval_secs: config.cycle_poll_interval_secs,
    });
    tokio::spawn(scheduler::run(scheduler_state));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState { store });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/pots", post(api::create_pot))
        .route("/pots/:slug", get(api::get_pot))
        .route("/pots/:slug/contributions", get(api::list_contributions))
        .route("/pots/:slug/contribute", post(api::contribute))
        .route("/pots/:slug/estimate", get(api::estimate))
        .route("/pots/:slug/close", post(api::close_pot))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
