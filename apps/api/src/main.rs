mod config;
mod db;
mod errors;
mod mapping;
mod models;
mod pipeline;
mod resilience;
mod routes;
mod scoring;
mod state;
mod storage;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::mapping::FieldMapping;
use crate::routes::build_router;
use crate::scoring::HttpScoringClient;
use crate::state::AppState;
use crate::storage::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Career API v{}", env!("CARGO_PKG_VERSION"));

    // Field mapping is validated in full before anything can serve a request
    let mapping = Arc::new(FieldMapping::from_env().context("Invalid field mapping configuration")?);
    for (field, external) in mapping.iter() {
        debug!("field mapping: {} -> {}", field.symbol(), external);
    }

    // Initialize PostgreSQL storage
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    let store = Arc::new(PgStore::new(pool, Arc::clone(&mapping)));

    // Initialize scoring client
    let scorer = Arc::new(HttpScoringClient::new(
        &config.scoring_service_url,
        Arc::clone(&mapping),
    )?);
    info!("Scoring client initialized (endpoint: {})", scorer.endpoint());

    info!(
        "Pipeline policy: storage timeout {}ms, scoring timeout {}ms, {} scoring attempts",
        config.storage_timeout.as_millis(),
        config.scoring_timeout.as_millis(),
        config.scoring_max_attempts
    );

    // Build app state
    let state = AppState::new(config.clone(), mapping, store, scorer);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
