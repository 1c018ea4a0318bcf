//! Discovery client for a Prometheus-compatible backend.
//!
//! # Responsibilities
//! - Fetch the series emitted for a service selector
//! - Enrich each metric name with metadata (type, help)
//! - Fall back to parsing raw exposition text when the API fails
//!
//! # Design Decisions
//! - Every request has a timeout; the whole discovery has a deadline
//! - Metadata runs on what is left of the deadline and never costs the series
//! - Connection failures, timeouts and 5xx are retried with jittered backoff
//! - Metadata failures degrade single metrics, never the snapshot
//! - `discover` never fails; `try_discover` reports why it came back empty

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::DiscoveryConfig;
use crate::discovery::classifier;
use crate::discovery::exposition;
use crate::discovery::retry::RetryPolicy;
use crate::discovery::types::{DiscoveredMetric, DiscoveryResult, MetricType};
use crate::observability::metrics;

/// Concurrent metadata lookups per discovery.
const METADATA_CONCURRENCY: usize = 8;

/// Why a discovery produced nothing.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid discovery URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("discovery exceeded its {0:?} deadline")]
    Deadline(Duration),

    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Envelope of every Prometheus HTTP API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    #[serde(rename = "type", default)]
    metric_type: String,
    #[serde(default)]
    help: String,
}

pub struct DiscoveryClient {
    http: reqwest::Client,
    config: DiscoveryConfig,
    base: Url,
    retry: RetryPolicy,
}

impl DiscoveryClient {
    pub fn new(config: DiscoveryConfig) -> Result<Self, DiscoveryError> {
        let mut base = Url::parse(&config.url)?;
        // Keep any path prefix (e.g. /prometheus) when joining API paths.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("service-dashboards/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| DiscoveryError::Http {
                url: config.url.clone(),
                source,
            })?;
        let retry = RetryPolicy::new(config.max_attempts, config.base_delay_ms, config.max_delay_ms);
        Ok(Self {
            http,
            config,
            base,
            retry,
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Series selector for one service, e.g. `{service="payment-api"}`.
    pub fn selector_for(&self, service: &str) -> String {
        selector(&self.config.selector_label, service)
    }

    /// Discover a service's metrics. Any failure yields an empty snapshot.
    pub async fn discover(&self, service: &str) -> DiscoveryResult {
        match self.try_discover(service).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(service = %service, error = %e, "Discovery unavailable, continuing without it");
                DiscoveryResult::empty()
            }
        }
    }

    /// Discover a service's metrics under the configured deadline.
    pub async fn try_discover(&self, service: &str) -> Result<DiscoveryResult, DiscoveryError> {
        let started = Instant::now();
        let until = tokio::time::Instant::now() + self.deadline();

        let outcome = self.discover_inner(service, until).await;

        let label = match &outcome {
            Ok(_) => "success",
            Err(DiscoveryError::Deadline(_)) => "deadline",
            Err(_) => "failure",
        };
        metrics::record_discovery(label, started.elapsed());

        if let Ok(result) = &outcome {
            tracing::info!(
                service = %service,
                metrics = result.total,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Discovery complete"
            );
        }
        outcome
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(self.config.deadline_secs)
    }

    /// Run `fut` until the discovery deadline.
    async fn before<T, F>(&self, until: tokio::time::Instant, fut: F) -> Result<T, DiscoveryError>
    where
        F: Future<Output = Result<T, DiscoveryError>>,
    {
        match tokio::time::timeout_at(until, fut).await {
            Ok(result) => result,
            Err(_) => Err(DiscoveryError::Deadline(self.deadline())),
        }
    }

    async fn discover_inner(
        &self,
        service: &str,
        until: tokio::time::Instant,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        let selector = self.selector_for(service);
        match self.structured(&selector, until).await {
            Ok(metrics) => Ok(DiscoveryResult::new(metrics)),
            Err(e @ DiscoveryError::Deadline(_)) => Err(e),
            Err(e) if self.config.exposition_fallback => {
                tracing::debug!(service = %service, error = %e, "Query API failed, trying exposition endpoint");
                let metrics = self
                    .before(until, self.fallback(service))
                    .await
                    .map_err(|fallback_err| {
                        tracing::debug!(error = %fallback_err, "Exposition fallback failed");
                        match fallback_err {
                            DiscoveryError::Deadline(_) => fallback_err,
                            _ => e,
                        }
                    })?;
                Ok(DiscoveryResult::new(metrics))
            }
            Err(e) => Err(e),
        }
    }

    /// Series API, then metadata per unique name. Metadata only gets what is
    /// left of the deadline; names it misses are typed from their name.
    async fn structured(
        &self,
        selector: &str,
        until: tokio::time::Instant,
    ) -> Result<Vec<DiscoveredMetric>, DiscoveryError> {
        let mut url = self.base.join("api/v1/series")?;
        url.query_pairs_mut().append_pair("match[]", selector);
        let series: Vec<HashMap<String, String>> = self.before(until, self.get_api(url)).await?;

        let mut by_name: BTreeMap<String, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();
        for mut labels in series {
            let Some(name) = labels.remove("__name__") else {
                continue;
            };
            let entry = by_name.entry(name).or_default();
            for (label, value) in labels {
                entry.entry(label).or_default().insert(value);
            }
        }

        let metadata = self.metadata_until(by_name.keys().cloned().collect(), until).await;

        let metrics = by_name
            .into_iter()
            .map(|(name, labels)| {
                let mut metric = DiscoveredMetric::new(name);
                metric.labels = labels;
                if let Some(meta) = metadata.get(&metric.name) {
                    metric.metric_type = MetricType::parse(&meta.metric_type);
                    metric.help = Some(meta.help.clone()).filter(|h| !h.is_empty());
                }
                classifier::classify(metric)
            })
            .collect();
        Ok(metrics)
    }

    /// Metadata for as many of `names` as answer before `until`.
    async fn metadata_until(
        &self,
        names: Vec<String>,
        until: tokio::time::Instant,
    ) -> HashMap<String, MetadataEntry> {
        let total = names.len();
        let lookups = stream::iter(names)
            .map(|name| async move {
                let meta = self.metadata(&name).await;
                (name, meta)
            })
            .buffer_unordered(METADATA_CONCURRENCY);
        tokio::pin!(lookups);

        let mut found = HashMap::new();
        let mut answered = 0;
        loop {
            match tokio::time::timeout_at(until, lookups.next()).await {
                Ok(Some((name, result))) => {
                    answered += 1;
                    match result {
                        Ok(Some(meta)) => {
                            found.insert(name, meta);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::debug!(metric = %name, error = %e, "Metadata unavailable");
                        }
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        pending = total - answered,
                        "Metadata lookups reached the discovery deadline, keeping the rest untyped"
                    );
                    break;
                }
            }
        }
        found
    }

    async fn metadata(&self, name: &str) -> Result<Option<MetadataEntry>, DiscoveryError> {
        let mut url = self.base.join("api/v1/metadata")?;
        url.query_pairs_mut().append_pair("metric", name);
        let mut data: HashMap<String, Vec<MetadataEntry>> = self.get_api(url).await?;
        Ok(data.remove(name).and_then(|entries| entries.into_iter().next()))
    }

    /// Raw exposition text, filtered to the service's samples.
    async fn fallback(&self, service: &str) -> Result<Vec<DiscoveredMetric>, DiscoveryError> {
        let url = Url::parse(&self.config.exposition_endpoint())?;
        let response = self.get(url.clone()).await?;
        let text = response.text().await.map_err(|source| DiscoveryError::Http {
            url: url.to_string(),
            source,
        })?;
        let parsed = exposition::parse(&text, Some((self.config.selector_label.as_str(), service)));
        Ok(parsed.into_iter().map(classifier::classify).collect())
    }

    async fn get_api<T: DeserializeOwned>(&self, url: Url) -> Result<T, DiscoveryError> {
        let display = url.to_string();
        let response = self.get(url).await?;
        let body: ApiResponse<T> = response.json().await.map_err(|e| DiscoveryError::Malformed {
            url: display.clone(),
            reason: e.to_string(),
        })?;
        if body.status != "success" {
            return Err(DiscoveryError::Malformed {
                url: display,
                reason: body.error.unwrap_or_else(|| format!("status '{}'", body.status)),
            });
        }
        body.data.ok_or_else(|| DiscoveryError::Malformed {
            url: display,
            reason: "missing data".to_string(),
        })
    }

    /// GET with retries. Client errors are returned immediately.
    async fn get(&self, url: Url) -> Result<reqwest::Response, DiscoveryError> {
        let mut last_error = None;
        for attempt in 0..self.retry.max_attempts {
            let delay = self.retry.delay(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let error = match self.http.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let error = DiscoveryError::Status {
                        url: url.to_string(),
                        status,
                    };
                    if !RetryPolicy::is_retryable_status(status) {
                        return Err(error);
                    }
                    error
                }
                Err(e) if e.is_timeout() => DiscoveryError::Timeout { url: url.to_string() },
                Err(e) if e.is_connect() || e.is_request() => DiscoveryError::Http {
                    url: url.to_string(),
                    source: e,
                },
                Err(e) => {
                    return Err(DiscoveryError::Http {
                        url: url.to_string(),
                        source: e,
                    })
                }
            };
            tracing::debug!(url = %url, attempt = attempt + 1, error = %error, "Discovery request failed");
            last_error = Some(error);
        }
        Err(last_error.unwrap_or(DiscoveryError::Timeout { url: url.to_string() }))
    }
}

/// `{label="value"}` with the value escaped for PromQL.
pub fn selector(label: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{{{}=\"{}\"}}", label, escaped)
}
