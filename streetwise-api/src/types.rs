//! Trait seams and shared types for the service layer.
//!
//! The aggregator and route handlers depend on these traits rather than on
//! the concrete clients, so tests substitute in-memory fakes.

use serde_json::Value;
use thiserror::Error;

use streetwise_common::types::{CollectionQuery, RouteType};

/// Upstream fetch failure, carrying the originating collection identifier.
///
/// Recovered inside the aggregation pipeline: the offending collection or
/// roadlink is logged and skipped. This error never crosses the
/// aggregator's boundary.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error fetching {collection}: {message}")]
    Network { collection: String, message: String },

    #[error("Timed out fetching {collection}")]
    Timeout { collection: String },

    #[error("API error {status} from {collection}: {body}")]
    Api {
        collection: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {collection}: {message}")]
    Decode { collection: String, message: String },
}

/// One-page feature fetches against the upstream collection API.
///
/// Each call issues exactly one request: no retry, no backoff. The
/// per-call timeout is the only guard, and callers treat a timeout like
/// any other fetch failure.
#[async_trait::async_trait]
pub trait FeatureFetcher: Send + Sync {
    /// Fetch one page of features for a collection query.
    async fn collection_features(&self, query: &CollectionQuery) -> Result<Value, FetchError>;

    /// Fetch a single feature by id, returned bare (not wrapped in a
    /// feature collection).
    async fn feature_by_id(
        &self,
        collection_id: &str,
        feature_id: &str,
    ) -> Result<Value, FetchError>;
}

/// Downstream summariser collaborator.
///
/// Consumes pre-processed aggregation output plus a route-type tag and
/// returns a structured summary, passed through to the caller unchanged.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarise(
        &self,
        data: &Value,
        route_type: RouteType,
    ) -> streetwise_common::Result<Value>;
}
