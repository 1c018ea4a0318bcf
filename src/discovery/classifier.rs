//! Raw metric → technology group and inferred type.
//!
//! # Design Decisions
//! - One ordered pattern table; the first match wins
//! - Specific prefixes come before generic substrings, and the order is part of
//!   the behavior: moving an entry changes classifications
//! - A backend-supplied type is never overwritten by inference

use crate::discovery::types::{DiscoveredMetric, MetricType};

/// Technology assigned when no pattern matches.
pub const CUSTOM_TECHNOLOGY: &str = "custom";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    Prefix,
    Contains,
}

const PATTERNS: &[(&str, Match, &str)] = &[
    // Exporter prefixes
    ("pg_", Match::Prefix, "postgresql"),
    ("timescaledb_", Match::Prefix, "postgresql"),
    ("mysql_", Match::Prefix, "mysql"),
    ("mongodb_", Match::Prefix, "mongodb"),
    ("redis_", Match::Prefix, "redis"),
    ("kafka_", Match::Prefix, "kafka"),
    ("rabbitmq_", Match::Prefix, "rabbitmq"),
    ("elasticsearch_", Match::Prefix, "elasticsearch"),
    ("opensearch_", Match::Prefix, "elasticsearch"),
    ("kube_", Match::Prefix, "kubernetes"),
    ("container_", Match::Prefix, "kubernetes"),
    // Process runtimes
    ("process_", Match::Prefix, "runtime"),
    ("go_", Match::Prefix, "runtime"),
    ("jvm_", Match::Prefix, "runtime"),
    ("nodejs_", Match::Prefix, "runtime"),
    ("python_", Match::Prefix, "runtime"),
    // Request serving
    ("nginx_ingress_", Match::Prefix, "http"),
    ("envoy_", Match::Prefix, "http"),
    ("haproxy_", Match::Prefix, "http"),
    ("grpc_server_", Match::Prefix, "http"),
    ("http_", Match::Prefix, "http"),
    // Generic substrings
    ("postgres", Match::Contains, "postgresql"),
    ("mysql", Match::Contains, "mysql"),
    ("mongo", Match::Contains, "mongodb"),
    ("redis", Match::Contains, "redis"),
    ("kafka", Match::Contains, "kafka"),
    ("rabbit", Match::Contains, "rabbitmq"),
    ("elastic", Match::Contains, "elasticsearch"),
    ("celery_", Match::Contains, "worker"),
    ("job", Match::Contains, "worker"),
    ("worker", Match::Contains, "worker"),
    ("consumer_lag", Match::Contains, "stream"),
    ("event", Match::Contains, "stream"),
    ("message", Match::Contains, "stream"),
    ("stream", Match::Contains, "stream"),
    ("request", Match::Contains, "http"),
];

/// Technology group for a metric name.
pub fn technology_for(name: &str) -> &'static str {
    PATTERNS
        .iter()
        .find(|(pattern, kind, _)| match kind {
            Match::Prefix => name.starts_with(pattern),
            Match::Contains => name.contains(pattern),
        })
        .map(|(_, _, technology)| *technology)
        .unwrap_or(CUSTOM_TECHNOLOGY)
}

/// Suffix heuristics for metrics whose type the backend did not report.
pub fn infer_type(name: &str) -> MetricType {
    if name.ends_with("_total") || name.ends_with("_count") || name.ends_with("_created") {
        MetricType::Counter
    } else if name.ends_with("_bucket") {
        MetricType::Histogram
    } else if name.ends_with("_sum") {
        MetricType::Summary
    } else if name.contains("_seconds_") {
        MetricType::Histogram
    } else {
        // _bytes, _ratio, _percentage and anything else
        MetricType::Gauge
    }
}

/// Assign technology and, when unknown, an inferred type.
pub fn classify(mut metric: DiscoveredMetric) -> DiscoveredMetric {
    metric.technology = technology_for(&metric.name).to_string();
    if metric.metric_type == MetricType::Unknown {
        metric.metric_type = infer_type(&metric.name);
    }
    metric
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_prefixes() {
        assert_eq!(technology_for("pg_stat_activity_count"), "postgresql");
        assert_eq!(technology_for("redis_connected_clients"), "redis");
        assert_eq!(technology_for("kube_pod_container_status_restarts_total"), "kubernetes");
        assert_eq!(technology_for("http_requests_total"), "http");
        assert_eq!(technology_for("process_cpu_seconds_total"), "runtime");
    }

    #[test]
    fn test_prefix_beats_substring() {
        // Contains "job" and "request", but the http_ prefix is listed first.
        assert_eq!(technology_for("http_job_requests_total"), "http");
        // kafka_ prefix wins over the consumer_lag substring.
        assert_eq!(technology_for("kafka_consumer_lag"), "kafka");
        assert_eq!(technology_for("myapp_consumer_lag"), "stream");
    }

    #[test]
    fn test_substring_fallbacks() {
        assert_eq!(technology_for("app_postgres_pool_size"), "postgresql");
        assert_eq!(technology_for("jobs_processed_total"), "worker");
        assert_eq!(technology_for("events_processed_total"), "stream");
        assert_eq!(technology_for("orders_placed"), CUSTOM_TECHNOLOGY);
    }

    #[test]
    fn test_infer_type() {
        assert_eq!(infer_type("http_requests_total"), MetricType::Counter);
        assert_eq!(infer_type("rpc_count"), MetricType::Counter);
        assert_eq!(infer_type("app_start_created"), MetricType::Counter);
        assert_eq!(infer_type("http_request_duration_seconds_bucket"), MetricType::Histogram);
        assert_eq!(infer_type("rpc_latency_sum"), MetricType::Summary);
        assert_eq!(infer_type("queue_wait_seconds_max"), MetricType::Histogram);
        assert_eq!(infer_type("pg_database_size_bytes"), MetricType::Gauge);
        assert_eq!(infer_type("up"), MetricType::Gauge);
    }

    #[test]
    fn test_backend_type_is_kept() {
        let mut m = DiscoveredMetric::new("weird_total");
        m.metric_type = MetricType::Gauge;
        let classified = classify(m);
        assert_eq!(classified.metric_type, MetricType::Gauge);

        let inferred = classify(DiscoveredMetric::new("weird_total"));
        assert_eq!(inferred.metric_type, MetricType::Counter);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let names = ["pg_up", "redis_up", "job_runs", "x_event_count", "nothing"];
        let first: Vec<_> = names.iter().map(|n| technology_for(n)).collect();
        let second: Vec<_> = names.iter().map(|n| technology_for(n)).collect();
        assert_eq!(first, second);
    }
}
