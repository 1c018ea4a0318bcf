//! Push boundary: envelope and HTTP client for the dashboard API.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::GrafanaConfig;

const SAVE_PATH: &str = "api/dashboards/db";

/// Errors from pushing a dashboard.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("API token variable {0} is not set")]
    MissingToken(String),

    #[error("invalid API token: {0}")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),

    #[error("invalid dashboard API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("dashboard API returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Request body of the save endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardEnvelope {
    pub dashboard: Value,
    pub overwrite: bool,
    pub message: String,
    #[serde(rename = "folderUid", skip_serializing_if = "Option::is_none")]
    pub folder_uid: Option<String>,
}

impl DashboardEnvelope {
    pub fn new(dashboard: Value, config: &GrafanaConfig, message: impl Into<String>) -> Self {
        Self {
            dashboard,
            overwrite: config.overwrite,
            message: message.into(),
            folder_uid: config.folder_uid.clone(),
        }
    }
}

/// Save endpoint response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PushResponse {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: u64,
}

pub struct GrafanaClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl GrafanaClient {
    /// Client authenticated with the token named by `api_token_env`.
    pub fn new(config: &GrafanaConfig) -> Result<Self, PushError> {
        let token = std::env::var(&config.api_token_env)
            .map_err(|_| PushError::MissingToken(config.api_token_env.clone()))?;
        Self::with_token(config, &token)
    }

    pub fn with_token(config: &GrafanaConfig, token: &str) -> Result<Self, PushError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut base = Url::parse(&config.url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(SAVE_PATH)?;
        Ok(Self { http, endpoint })
    }

    pub async fn push(&self, envelope: &DashboardEnvelope) -> Result<PushResponse, PushError> {
        let response = self.http.post(self.endpoint.clone()).json(envelope).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), endpoint = %self.endpoint, "Dashboard push rejected");
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let saved: PushResponse = response.json().await?;
        tracing::info!(uid = %saved.uid, version = saved.version, url = %saved.url, "Dashboard pushed");
        Ok(saved)
    }
}
