//! Upstream feature-collection API client
//!
//! Implements `FeatureFetcher` over the hosted feature API: one page of
//! features per collection query, or a single feature by id. Each call is
//! one network request with the configured timeout; there is no retry or
//! backoff, the aggregation pipeline's skip-on-error policy absorbs
//! individual failures.

use std::time::Duration;

use serde_json::Value;

use streetwise_common::config::AppConfig;
use streetwise_common::types::{CollectionFilter, CollectionQuery};
use streetwise_common::Error;

use crate::types::{FeatureFetcher, FetchError};

const USER_AGENT: &str = concat!("streetwise/", env!("CARGO_PKG_VERSION"));

/// Feature API client
pub struct NgdClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NgdClient {
    pub fn new(config: &AppConfig) -> streetwise_common::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.ngd_base_url.trim_end_matches('/').to_string(),
            api_key: config.ngd_api_key.clone(),
        })
    }

    fn items_url(&self, collection_id: &str) -> String {
        format!("{}/collections/{}/items", self.base_url, collection_id)
    }

    fn item_url(&self, collection_id: &str, feature_id: &str) -> String {
        format!(
            "{}/collections/{}/items/{}",
            self.base_url, collection_id, feature_id
        )
    }

    fn query_params(query: &CollectionQuery) -> Vec<(&'static str, String)> {
        match &query.filter {
            CollectionFilter::Attribute { name, value } => {
                vec![("filter", format!("{name}={value}"))]
            }
            CollectionFilter::Bbox { bbox, bbox_crs, crs } => vec![
                ("bbox", bbox.clone()),
                ("bbox-crs", bbox_crs.clone()),
                ("crs", crs.clone()),
            ],
        }
    }

    async fn get_json(
        &self,
        collection_id: &str,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<Value, FetchError> {
        tracing::debug!(collection = collection_id, url, "Querying feature API");

        let response = self
            .http_client
            .get(url)
            .query(params)
            .header("key", self.api_key.as_str())
            .send()
            .await
            .map_err(|e| classify_request_error(collection_id, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                collection: collection_id.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| FetchError::Decode {
            collection: collection_id.to_string(),
            message: e.to_string(),
        })
    }
}

fn classify_request_error(collection_id: &str, err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            collection: collection_id.to_string(),
        }
    } else {
        FetchError::Network {
            collection: collection_id.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl FeatureFetcher for NgdClient {
    async fn collection_features(&self, query: &CollectionQuery) -> Result<Value, FetchError> {
        let url = self.items_url(&query.collection_id);
        let params = Self::query_params(query);
        self.get_json(&query.collection_id, &url, &params).await
    }

    async fn feature_by_id(
        &self,
        collection_id: &str,
        feature_id: &str,
    ) -> Result<Value, FetchError> {
        let url = self.item_url(collection_id, feature_id);
        self.get_json(collection_id, &url, &[]).await
    }
}
