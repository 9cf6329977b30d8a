//! Downstream summariser collaborator
//!
//! Posts pre-processed feature data to an OpenAI-compatible
//! chat-completions endpoint and returns the structured summary together
//! with the raw input as `{"llm_summary", "raw_data"}`. The summary is
//! passed through to the caller unchanged.

use std::time::Duration;

use serde_json::{json, Value};

use streetwise_common::config::AppConfig;
use streetwise_common::types::RouteType;
use streetwise_common::{Error, Result};

use crate::types::Summarizer;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Chat-completions backed summariser.
pub struct LlmSummarizer {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmSummarizer {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.summary_base_url.trim_end_matches('/').to_string(),
            api_key: config.summary_api_key.clone(),
            model: config.summary_model.clone(),
        })
    }
}

fn system_prompt(route_type: RouteType) -> &'static str {
    match route_type {
        RouteType::StreetInfo => {
            "You are a street assessment system. Analyse the supplied street \
             data and respond with a JSON object holding string arrays \
             \"location\", \"road_characteristics\", \"infrastructure\", \
             \"restrictions_and_designations\", \"traffic_management\", \
             \"assessment_notes\" and a string \"summary\". Report every \
             roadlink, designation, measurement and percentage found in the \
             data; be exhaustive and precise."
        }
        RouteType::LandUse => {
            "You are a land use assessment system. Analyse the supplied land \
             use data and respond with a JSON object holding string arrays \
             \"location\", \"land_use_classification\", \
             \"properties_and_sites\", \"area_statistics\", \
             \"notable_features\", \"contextual_information\" and a string \
             \"summary\". List every property with its full details and \
             area measurements; be exhaustive and precise."
        }
        RouteType::CollaborativeStreetWorks => {
            "You are a street works planning system. The supplied data \
             combines a street assessment with the land use around it. \
             Respond with a JSON object holding string arrays \
             \"street_findings\", \"land_use_findings\", \
             \"collaboration_opportunities\", \"constraints\" and a string \
             \"recommendation\" describing how works on this street could \
             be coordinated; be exhaustive and precise."
        }
    }
}

#[async_trait::async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarise(&self, data: &Value, route_type: RouteType) -> Result<Value> {
        let context = serde_json::to_string_pretty(data)
            .map_err(|e| Error::Internal(format!("Failed to render summary context: {e}")))?;

        let request = json!({
            "model": self.model,
            "temperature": 0.5,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": system_prompt(route_type)},
                {
                    "role": "user",
                    "content": format!(
                        "Analyze this data and provide a comprehensive assessment \
                         with all available information:\n\n{context}"
                    ),
                },
            ],
        });

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("Summary request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!("Summary API error {status}: {body}")));
        }

        let completion: Value = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("Malformed summary response: {e}")))?;

        let content = completion
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Internal("Summary response missing content".to_string()))?;

        let summary: Value = serde_json::from_str(content)
            .map_err(|e| Error::Internal(format!("Summary content is not valid JSON: {e}")))?;

        tracing::info!(route = %route_type, "Summary generated");
        Ok(json!({"llm_summary": summary, "raw_data": data}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streetwise_common::types::DEFAULT_CRS;

    fn test_config() -> AppConfig {
        AppConfig {
            bind_address: "127.0.0.1:8080".to_string(),
            ngd_base_url: "https://api.example.test/features/v1".to_string(),
            ngd_api_key: "test-key".to_string(),
            fetch_timeout_secs: 5,
            store_url: "sqlite::memory:".to_string(),
            store_schema: "main".to_string(),
            store_table: "usrn_geometries".to_string(),
            default_crs: DEFAULT_CRS.to_string(),
            buffer_distance: 50.0,
            summary_base_url: "https://api.example.test/v1/".to_string(),
            summary_api_key: "test-summary-key".to_string(),
            summary_model: "test-model".to_string(),
        }
    }

    #[test]
    fn client_creation_succeeds() {
        let summarizer = LlmSummarizer::new(&test_config()).unwrap();
        assert_eq!(summarizer.base_url, "https://api.example.test/v1");
        assert_eq!(summarizer.model, "test-model");
    }

    #[test]
    fn each_route_type_has_a_distinct_prompt() {
        let prompts = [
            system_prompt(RouteType::StreetInfo),
            system_prompt(RouteType::LandUse),
            system_prompt(RouteType::CollaborativeStreetWorks),
        ];
        for prompt in prompts {
            assert!(!prompt.is_empty());
        }
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
    }
}
