//! Database query configuration
//!
//! This module contains the configuration structure for one queried
//! database, loaded from YAML (or JSON) and overridable from the command line.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimit, RetryPolicy};
use crate::property::{LocalTime, PropertyKind, DEFAULT_SUPPORTED_KINDS};
use crate::schema::SchemaFilter;
use crate::types::{BackoffType, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Database Config
// ============================================================================

/// Complete configuration for querying one database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Integration token
    #[serde(default)]
    pub api_token: String,

    /// Database to query
    #[serde(default)]
    pub database_id: String,

    /// Query body template as JSON text (filters, sorts, page size)
    #[serde(default)]
    pub query: Option<String>,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub http_connect_timeout_ms: u64,

    /// Total request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Liveness watchdog timeout in milliseconds
    #[serde(default = "default_watchdog_timeout_ms")]
    pub watchdog_timeout_ms: u64,

    /// Upper bound for the parse buffer in bytes
    #[serde(default = "default_json_parse_buffer_size")]
    pub json_parse_buffer_size: usize,

    /// Verify server certificates
    #[serde(default)]
    pub verify_ssl: bool,

    /// Seconds between periodic updates
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Property names to extract (empty = all)
    #[serde(default)]
    pub property_filters: Vec<String>,

    /// Property kinds eligible for extraction
    #[serde(default = "default_supported_types")]
    pub supported_types: Vec<PropertyKind>,

    /// Fixed UTC offset for timestamps; host local time when absent
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,

    /// Retries per request (0 = fail on first error)
    #[serde(default)]
    pub max_retries: u32,

    /// Retry backoff
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Client-side request rate limit (0 = unlimited)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            database_id: String::new(),
            query: None,
            base_url: default_base_url(),
            http_connect_timeout_ms: default_connect_timeout_ms(),
            http_timeout_ms: default_timeout_ms(),
            watchdog_timeout_ms: default_watchdog_timeout_ms(),
            json_parse_buffer_size: default_json_parse_buffer_size(),
            verify_ssl: false,
            update_interval_secs: default_update_interval_secs(),
            property_filters: Vec::new(),
            supported_types: default_supported_types(),
            utc_offset_minutes: None,
            max_retries: 0,
            retry_backoff: BackoffConfig::default(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.notion.com".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_watchdog_timeout_ms() -> u64 {
    15_000
}

fn default_json_parse_buffer_size() -> usize {
    20 * 1024
}

fn default_update_interval_secs() -> u64 {
    60
}

fn default_supported_types() -> Vec<PropertyKind> {
    DEFAULT_SUPPORTED_KINDS.to_vec()
}

fn default_requests_per_second() -> u32 {
    3
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60_000
}

impl DatabaseConfig {
    /// Create a config for a database with every other field defaulted
    pub fn new(api_token: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            database_id: database_id.into(),
            ..Default::default()
        }
    }

    /// Check the fields a fetch cycle depends on
    ///
    /// Fails on an empty token, an empty database id or a query template
    /// that is not a JSON object.
    pub fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(Error::missing_field("api_token"));
        }
        if self.database_id.is_empty() {
            return Err(Error::missing_field("database_id"));
        }
        self.query_template()?;
        Ok(())
    }

    /// Check the fields that are fixed for the lifetime of a pager
    pub fn validate_settings(&self) -> Result<()> {
        if self.json_parse_buffer_size == 0 {
            return Err(Error::invalid_value(
                "json_parse_buffer_size",
                "must be greater than zero",
            ));
        }
        if self.update_interval_secs == 0 {
            return Err(Error::invalid_value(
                "update_interval_secs",
                "must be greater than zero",
            ));
        }
        self.local_time()?;
        url::Url::parse(&self.base_url)?;
        Ok(())
    }

    /// Decode the query template, `{}` when none is set
    pub fn query_template(&self) -> Result<JsonObject> {
        let text = match self.query.as_deref().map(str::trim) {
            None | Some("") => return Ok(JsonObject::new()),
            Some(text) => text,
        };

        match serde_json::from_str::<JsonValue>(text) {
            Ok(JsonValue::Object(map)) => Ok(map),
            Ok(_) => Err(Error::invalid_value("query", "must be a JSON object")),
            Err(e) => Err(Error::invalid_value("query", format!("invalid JSON: {e}"))),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.http_connect_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Zone timestamps are shifted into
    pub fn local_time(&self) -> Result<LocalTime> {
        match self.utc_offset_minutes {
            None => Ok(LocalTime::System),
            Some(minutes) => LocalTime::from_offset_minutes(minutes).ok_or_else(|| {
                Error::invalid_value(
                    "utc_offset_minutes",
                    format!("{minutes} is outside -1439..=1439"),
                )
            }),
        }
    }

    /// Filter built from `property_filters` and `supported_types`
    pub fn schema_filter(&self) -> SchemaFilter {
        SchemaFilter::new()
            .with_property_names(self.property_filters.iter().cloned())
            .with_supported_kinds(self.supported_types.iter().copied())
    }

    /// HTTP client settings derived from this config
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig::builder()
            .base_url(&self.base_url)
            .connect_timeout(self.connect_timeout())
            .timeout(self.timeout())
            .verify_ssl(self.verify_ssl)
            .retry(RetryPolicy {
                max_retries: self.max_retries,
                backoff: self.retry_backoff.backoff_type,
                initial_delay: Duration::from_millis(self.retry_backoff.initial_ms),
                max_delay: Duration::from_millis(self.retry_backoff.max_ms),
            })
            .rate_limit(RateLimit::from_config(self.requests_per_second))
            .build()
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load a config from a YAML or JSON file
pub fn load_config(path: impl AsRef<Path>) -> Result<DatabaseConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;
    load_config_from_str(&content)
}

/// Load a config from a YAML or JSON string
pub fn load_config_from_str(yaml: &str) -> Result<DatabaseConfig> {
    let config: DatabaseConfig = serde_yaml::from_str(yaml)?;

    config.validate_settings()?;
    Ok(config)
}
