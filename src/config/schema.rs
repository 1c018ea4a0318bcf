//! Configuration schema definitions.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for dashboard generation.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Live metric discovery against a Prometheus-compatible backend.
    pub discovery: DiscoveryConfig,

    /// Dashboard rendering defaults.
    pub dashboard: DashboardConfig,

    /// Multi-service builds.
    pub batch: BatchConfig,

    /// Push target for finished dashboards.
    pub grafana: GrafanaConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Discovery backend settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub enabled: bool,

    /// Base URL of the Prometheus HTTP API (e.g., "http://prometheus:9090").
    pub url: String,

    /// Raw exposition endpoint for fallback mode. Defaults to `{url}/metrics`.
    pub exposition_url: Option<String>,

    /// Parse raw exposition text when the query API fails.
    pub exposition_fallback: bool,

    /// Label that identifies a service's series.
    pub selector_label: String,

    /// Per-request timeout.
    pub request_timeout_secs: u64,

    /// Budget for the whole discovery phase of one build.
    pub deadline_secs: u64,

    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://localhost:9090".to_string(),
            exposition_url: None,
            exposition_fallback: true,
            selector_label: "service".to_string(),
            request_timeout_secs: 5,
            deadline_secs: 15,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

impl DiscoveryConfig {
    /// The fallback exposition endpoint, explicit or derived from `url`.
    pub fn exposition_endpoint(&self) -> String {
        match &self.exposition_url {
            Some(url) => url.clone(),
            None => format!("{}/metrics", self.url.trim_end_matches('/')),
        }
    }
}

/// How much of each dependency template to render.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyDetail {
    /// Only panels flagged for the overview.
    #[default]
    Overview,
    /// Every panel the template declares.
    Full,
}

/// Dashboard rendering defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Service type used when the declared type is unknown.
    pub default_service_type: String,

    pub dependency_detail: DependencyDetail,

    pub timezone: String,
    pub refresh: String,
    pub time_from: String,
    pub time_to: String,
    pub schema_version: u32,
    pub editable: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_service_type: "api".to_string(),
            dependency_detail: DependencyDetail::Overview,
            timezone: "browser".to_string(),
            refresh: "30s".to_string(),
            time_from: "now-6h".to_string(),
            time_to: "now".to_string(),
            schema_version: 39,
            editable: true,
        }
    }
}

/// Batch build settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Builds allowed to run at once.
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}

/// Dashboard push target.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GrafanaConfig {
    pub url: String,

    /// Environment variable holding the API token. The token itself is never
    /// stored in configuration.
    pub api_token_env: String,

    pub folder_uid: Option<String>,
    pub overwrite: bool,
    pub timeout_secs: u64,
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            api_token_env: "GRAFANA_API_TOKEN".to_string(),
            folder_uid: None,
            overwrite: true,
            timeout_secs: 10,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Prometheus exporter listen address; disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.discovery.enabled);
        assert_eq!(config.dashboard.dependency_detail, DependencyDetail::Overview);
    }

    #[test]
    fn test_partial_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [discovery]
            url = "http://prom:9090/"
            max_attempts = 5

            [dashboard]
            dependency_detail = "full"
            "#,
        )
        .unwrap();
        assert_eq!(config.discovery.max_attempts, 5);
        assert_eq!(config.discovery.selector_label, "service");
        assert_eq!(config.discovery.exposition_endpoint(), "http://prom:9090/metrics");
        assert_eq!(config.dashboard.dependency_detail, DependencyDetail::Full);
        assert_eq!(config.dashboard.refresh, "30s");
    }
}
