//! Geometry store access
//!
//! The store is the only shared resource; the pool serialises connection
//! acquisition while each borrowed connection runs exactly one query.

pub mod geometry;

use sqlx::SqlitePool;

use streetwise_common::config::AppConfig;
use streetwise_common::Result;

/// Connect to the read-only geometry store.
pub async fn init_store_pool(config: &AppConfig) -> Result<SqlitePool> {
    tracing::debug!("Connecting to geometry store: {}", config.store_url);
    let pool = SqlitePool::connect(&config.store_url).await?;
    Ok(pool)
}
