//! streetwise-api - USRN street assessment service
//!
//! Aggregates street network, regulatory designation and land-use features
//! for a USRN from the upstream feature-collection API and serves
//! summarised views of the result.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use streetwise_api::services::ngd_client::NgdClient;
use streetwise_api::services::summarizer::LlmSummarizer;
use streetwise_api::AppState;
use streetwise_common::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting streetwise-api");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve configuration once; constructors receive the result.
    let config_path = std::env::var("STREETWISE_CONFIG").ok().map(PathBuf::from);
    let config = Arc::new(AppConfig::load(config_path.as_deref())?);

    let db_pool = streetwise_api::db::init_store_pool(&config).await?;
    info!("Geometry store connection established");

    let fetcher = Arc::new(NgdClient::new(&config)?);
    let summarizer = Arc::new(LlmSummarizer::new(&config)?);

    let state = AppState::new(db_pool, Arc::clone(&config), fetcher, summarizer);
    let app = streetwise_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
