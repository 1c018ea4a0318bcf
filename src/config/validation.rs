//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, attempts ≥ 1)
//! - Check URLs parse and the default service type exists
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::AppConfig;
use crate::templates::{LevelFilter, TemplateRegistry};

/// One semantic problem, located by its dotted config path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let discovery = &config.discovery;
    if discovery.enabled {
        check_http_url(&mut errors, "discovery.url", &discovery.url);
        if let Some(exposition) = &discovery.exposition_url {
            check_http_url(&mut errors, "discovery.exposition_url", exposition);
        }
    }
    if discovery.selector_label.is_empty()
        || !discovery
            .selector_label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.push(ValidationError::new(
            "discovery.selector_label",
            format!("'{}' is not a valid label name", discovery.selector_label),
        ));
    }
    if discovery.request_timeout_secs == 0 {
        errors.push(ValidationError::new("discovery.request_timeout_secs", "must be > 0"));
    }
    if discovery.deadline_secs == 0 {
        errors.push(ValidationError::new("discovery.deadline_secs", "must be > 0"));
    }
    if discovery.max_attempts == 0 {
        errors.push(ValidationError::new("discovery.max_attempts", "must be ≥ 1"));
    }
    if discovery.base_delay_ms > discovery.max_delay_ms {
        errors.push(ValidationError::new(
            "discovery.base_delay_ms",
            "must not exceed discovery.max_delay_ms",
        ));
    }

    let dashboard = &config.dashboard;
    if TemplateRegistry::global()
        .service_type(&dashboard.default_service_type, LevelFilter::All)
        .is_none()
    {
        errors.push(ValidationError::new(
            "dashboard.default_service_type",
            format!("unknown service type '{}'", dashboard.default_service_type),
        ));
    }
    if dashboard.time_from.is_empty() || dashboard.time_to.is_empty() {
        errors.push(ValidationError::new("dashboard.time_from", "time range must not be empty"));
    }

    if config.batch.max_concurrency == 0 {
        errors.push(ValidationError::new("batch.max_concurrency", "must be ≥ 1"));
    }

    check_http_url(&mut errors, "grafana.url", &config.grafana.url);
    if config.grafana.timeout_secs == 0 {
        errors.push(ValidationError::new("grafana.timeout_secs", "must be > 0"));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "observability.metrics_address",
                format!("'{}' is not a socket address", addr),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(errors: &mut Vec<ValidationError>, field: &str, raw: &str) {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AppConfig::default();
        config.discovery.url = "not a url".into();
        config.discovery.max_attempts = 0;
        config.discovery.selector_label = "bad-label".into();
        config.dashboard.default_service_type = "mainframe".into();
        config.batch.max_concurrency = 0;
        config.observability.metrics_address = Some("localhost".into());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "discovery.url",
                "discovery.selector_label",
                "discovery.max_attempts",
                "dashboard.default_service_type",
                "batch.max_concurrency",
                "observability.metrics_address",
            ]
        );
    }

    #[test]
    fn test_disabled_discovery_skips_url_check() {
        let mut config = AppConfig::default();
        config.discovery.enabled = false;
        config.discovery.url = String::new();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_alias_is_accepted_as_default_type() {
        let mut config = AppConfig::default();
        config.dashboard.default_service_type = "REST".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let mut config = AppConfig::default();
        config.grafana.url = "ftp://grafana".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "grafana.url");
    }
}
