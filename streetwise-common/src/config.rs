//! Configuration resolution for the Streetwise services.
//!
//! Per-field priority: environment variable, then TOML config file, then
//! compiled default. Resolution happens once at startup and the resulting
//! `AppConfig` is threaded into constructors - business logic never reads
//! the environment.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::types::DEFAULT_CRS;
use crate::{Error, Result};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_NGD_BASE_URL: &str = "https://api.os.uk/features/ngd/ofa/v1";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_BUFFER_DISTANCE: f64 = 50.0;
pub const DEFAULT_SUMMARY_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";

/// TOML config file shape. Every field is optional; environment variables
/// win over file values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub bind_address: Option<String>,
    pub ngd_base_url: Option<String>,
    pub ngd_api_key: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
    pub store_url: Option<String>,
    pub store_schema: Option<String>,
    pub store_table: Option<String>,
    pub default_crs: Option<String>,
    pub buffer_distance: Option<f64>,
    pub summary_base_url: Option<String>,
    pub summary_api_key: Option<String>,
    pub summary_model: Option<String>,
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen address for the HTTP server.
    pub bind_address: String,
    /// Base URL of the upstream feature-collection API.
    pub ngd_base_url: String,
    /// API key sent with every feature request.
    pub ngd_api_key: String,
    /// Per-fetch timeout; a timed-out fetch is skipped like any other
    /// fetch failure.
    pub fetch_timeout_secs: u64,
    /// Geometry store connection URL (read-only).
    pub store_url: String,
    /// Schema holding the USRN geometry table.
    pub store_schema: String,
    /// Table holding the USRN geometry rows.
    pub store_table: String,
    /// CRS URI used when a request does not specify one.
    pub default_crs: String,
    /// Buffer distance applied when deriving a bounding box from a USRN.
    pub buffer_distance: f64,
    /// Base URL of the OpenAI-compatible summariser endpoint.
    pub summary_base_url: String,
    /// Summariser API key.
    pub summary_api_key: String,
    /// Summariser model name.
    pub summary_model: String,
}

impl AppConfig {
    /// Load configuration from the environment and an optional TOML file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let toml_config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                let parsed = toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))?;
                info!("Loaded config file: {}", path.display());
                parsed
            }
            _ => TomlConfig::default(),
        };
        Self::resolve(&toml_config)
    }

    /// Resolve the final configuration from environment variables and a
    /// parsed TOML file.
    pub fn resolve(toml: &TomlConfig) -> Result<Self> {
        let ngd_api_key = env_var("OS_KEY")
            .or_else(|| toml.ngd_api_key.clone())
            .ok_or_else(|| {
                Error::Config(
                    "Feature API key not configured (OS_KEY or ngd_api_key)".to_string(),
                )
            })?;
        let summary_api_key = env_var("OPENAI_API_KEY")
            .or_else(|| toml.summary_api_key.clone())
            .ok_or_else(|| {
                Error::Config(
                    "Summariser API key not configured (OPENAI_API_KEY or summary_api_key)"
                        .to_string(),
                )
            })?;

        let store_url = env_var("STREETWISE_STORE_URL")
            .or_else(|| toml.store_url.clone())
            .ok_or_else(|| {
                Error::Config(
                    "Geometry store URL not configured (STREETWISE_STORE_URL or store_url)"
                        .to_string(),
                )
            })?;
        let store_schema = env_var("USRN_SCHEMA")
            .or_else(|| toml.store_schema.clone())
            .ok_or_else(|| {
                Error::Config("Missing schema name (USRN_SCHEMA or store_schema)".to_string())
            })?;
        let store_table = env_var("USRN_TABLE")
            .or_else(|| toml.store_table.clone())
            .ok_or_else(|| {
                Error::Config("Missing table name (USRN_TABLE or store_table)".to_string())
            })?;
        for name in [&store_schema, &store_table] {
            if !is_valid_identifier(name) {
                return Err(Error::Config(format!("Invalid store identifier: {name}")));
            }
        }

        let fetch_timeout_secs = parse_env("STREETWISE_FETCH_TIMEOUT_SECS")?
            .or(toml.fetch_timeout_secs)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
        let buffer_distance = parse_env("STREETWISE_BUFFER_DISTANCE")?
            .or(toml.buffer_distance)
            .unwrap_or(DEFAULT_BUFFER_DISTANCE);

        Ok(Self {
            bind_address: env_var("STREETWISE_BIND_ADDRESS")
                .or_else(|| toml.bind_address.clone())
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            ngd_base_url: env_var("STREETWISE_NGD_BASE_URL")
                .or_else(|| toml.ngd_base_url.clone())
                .unwrap_or_else(|| DEFAULT_NGD_BASE_URL.to_string()),
            ngd_api_key,
            fetch_timeout_secs,
            store_url,
            store_schema,
            store_table,
            default_crs: env_var("STREETWISE_CRS")
                .or_else(|| toml.default_crs.clone())
                .unwrap_or_else(|| DEFAULT_CRS.to_string()),
            buffer_distance,
            summary_base_url: env_var("STREETWISE_SUMMARY_BASE_URL")
                .or_else(|| toml.summary_base_url.clone())
                .unwrap_or_else(|| DEFAULT_SUMMARY_BASE_URL.to_string()),
            summary_api_key,
            summary_model: env_var("STREETWISE_SUMMARY_MODEL")
                .or_else(|| toml.summary_model.clone())
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env_var(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("Invalid value for {name}: {raw}"))),
        None => Ok(None),
    }
}

/// Schema and table names are spliced into SQL; restrict them to plain
/// identifiers.
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
