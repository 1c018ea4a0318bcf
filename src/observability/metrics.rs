//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dashboards_built_total` (counter): finished builds by service type
//! - `dashboard_panels_dropped_total` (counter): panels removed by validation
//! - `metric_resolutions_total` (counter): intent resolutions by kind
//! - `discovery_requests_total` (counter): discovery calls by outcome
//! - `discovery_duration_seconds` (histogram): wall time of one discovery
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; with no recorder installed
//!   every call is a no-op
//! - The Prometheus exporter is optional and only installed by the binary

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_dashboard_built(service_type: &str) {
    metrics::counter!("dashboards_built_total", "service_type" => service_type.to_string())
        .increment(1);
}

pub fn record_panels_dropped(count: usize) {
    if count > 0 {
        metrics::counter!("dashboard_panels_dropped_total").increment(count as u64);
    }
}

pub fn record_resolution(kind: &'static str) {
    metrics::counter!("metric_resolutions_total", "kind" => kind).increment(1);
}

pub fn record_discovery(outcome: &'static str, elapsed: Duration) {
    metrics::counter!("discovery_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("discovery_duration_seconds").record(elapsed.as_secs_f64());
}
