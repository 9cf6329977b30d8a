//! streetwise-api library interface
//!
//! Exposes the application state and router assembly for integration
//! testing.

pub mod api;
pub mod db;
pub mod error;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use streetwise_common::config::AppConfig;

use crate::services::aggregator::FeatureAggregator;
use crate::services::bbox_resolver::BboxResolver;
use crate::types::{FeatureFetcher, Summarizer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Read-only geometry store pool
    pub db: SqlitePool,
    /// Resolved service configuration
    pub config: Arc<AppConfig>,
    /// Feature aggregation pipeline
    pub aggregator: Arc<FeatureAggregator>,
    /// USRN bounding-box resolver
    pub bbox_resolver: Arc<BboxResolver>,
    /// Downstream summariser collaborator
    pub summarizer: Arc<dyn Summarizer>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: Arc<AppConfig>,
        fetcher: Arc<dyn FeatureFetcher>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let aggregator = Arc::new(FeatureAggregator::new(fetcher, Arc::clone(&config)));
        let bbox_resolver = Arc::new(BboxResolver::new(db.clone(), Arc::clone(&config)));
        Self {
            db,
            config,
            aggregator,
            bbox_resolver,
            summarizer,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::street_info_routes())
        .merge(api::land_use_routes())
        .merge(api::collaborative_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
