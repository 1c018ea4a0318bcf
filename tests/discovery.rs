//! Discovery client against a mock Prometheus backend.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use service_dashboards::discovery::{DiscoveryCache, DiscoveryClient, DiscoveryError, MetricType};

mod common;
use common::{discovery_config, metadata_body, series_body, start_mock_backend, MockResponse};

const EXPOSITION: &str = r#"# HELP http_requests_total Requests.
# TYPE http_requests_total counter
http_requests_total{service="payment-api",status="200"} 1027
http_requests_total{service="payment-api",status="503"} 3
http_request_duration_seconds_bucket{service="payment-api",le="0.1"} 900
pg_stat_activity_count{service="payment-api",datname="orders"} 12
http_requests_total{service="other-api",status="200"} 5
other_only_metric{service="other-api"} 1
"#;

#[tokio::test]
async fn test_structured_discovery() {
    let (addr, log) = start_mock_backend(|req| match req.path.as_str() {
        "/api/v1/series" => MockResponse::ok(series_body(
            "payment-api",
            &["http_requests_total", "pg_stat_activity_count", "http_requests_total"],
        )),
        "/api/v1/metadata" => match req.query.get("metric").map(String::as_str) {
            Some("http_requests_total") => {
                MockResponse::ok(metadata_body("http_requests_total", "counter", "Requests."))
            }
            _ => MockResponse::ok(r#"{"status":"success","data":{}}"#),
        },
        _ => MockResponse::not_found(),
    })
    .await;

    let client = DiscoveryClient::new(discovery_config(addr)).unwrap();
    let result = client.try_discover("payment-api").await.unwrap();

    assert_eq!(result.total, 2);
    let requests = result.get("http_requests_total").unwrap();
    assert_eq!(requests.metric_type, MetricType::Counter);
    assert_eq!(requests.help.as_deref(), Some("Requests."));
    assert_eq!(requests.technology, "http");
    assert!(requests.labels["service"].contains("payment-api"));

    // No metadata: type inferred from the name.
    let pg = result.get("pg_stat_activity_count").unwrap();
    assert_eq!(pg.technology, "postgresql");
    assert_eq!(pg.metric_type, MetricType::Counter);

    assert_eq!(result.names_for("postgresql"), ["pg_stat_activity_count"]);

    let series = log.all().into_iter().find(|r| r.path == "/api/v1/series").unwrap();
    assert_eq!(series.query["match[]"], r#"{service="payment-api"}"#);
    assert_eq!(log.count("/metrics"), 0);
}

#[tokio::test]
async fn test_falls_back_to_exposition() {
    let (addr, log) = start_mock_backend(|req| match req.path.as_str() {
        "/metrics" => MockResponse::ok(EXPOSITION),
        _ => MockResponse::not_found(),
    })
    .await;

    let client = DiscoveryClient::new(discovery_config(addr)).unwrap();
    let result = client.try_discover("payment-api").await.unwrap();

    let names: Vec<&str> = result.names().collect();
    assert_eq!(
        names,
        vec![
            "http_request_duration_seconds_bucket",
            "http_requests_total",
            "pg_stat_activity_count"
        ]
    );
    assert_eq!(result.get("http_request_duration_seconds_bucket").unwrap().metric_type, MetricType::Histogram);
    assert!(!result.contains("other_only_metric"));
    // 404 is not retried.
    assert_eq!(log.count("/api/v1/series"), 1);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let (addr, log) = start_mock_backend(move |req| match req.path.as_str() {
        "/api/v1/series" => {
            if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                MockResponse::status(503, "unavailable")
            } else {
                MockResponse::ok(series_body("payment-api", &["http_requests_total"]))
            }
        }
        _ => MockResponse::ok(r#"{"status":"success","data":{}}"#),
    })
    .await;

    let client = DiscoveryClient::new(discovery_config(addr)).unwrap();
    let result = client.try_discover("payment-api").await.unwrap();
    assert!(result.contains("http_requests_total"));
    assert_eq!(log.count("/api/v1/series"), 3);
}

#[tokio::test]
async fn test_both_modes_failing_reports_query_api_error() {
    let (addr, _log) = start_mock_backend(|_| MockResponse::status(500, "boom")).await;

    let mut config = discovery_config(addr);
    config.max_attempts = 2;
    let client = DiscoveryClient::new(config).unwrap();
    let err = client.try_discover("payment-api").await.unwrap_err();
    match err {
        DiscoveryError::Status { url, status } => {
            assert_eq!(status, 500);
            assert!(url.contains("/api/v1/series"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(client.discover("payment-api").await.is_empty());
}

#[tokio::test]
async fn test_deadline_bounds_discovery() {
    let (addr, _log) = start_mock_backend(|_| {
        MockResponse::ok(series_body("payment-api", &["http_requests_total"])).delayed(Duration::from_secs(3))
    })
    .await;

    let mut config = discovery_config(addr);
    config.deadline_secs = 1;
    config.request_timeout_secs = 10;
    let client = DiscoveryClient::new(config).unwrap();

    let started = std::time::Instant::now();
    let err = client.try_discover("payment-api").await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Deadline(_)));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_garbage_yields_empty_snapshot() {
    let (addr, _log) = start_mock_backend(|_| MockResponse::ok("<html>not prometheus</html>")).await;

    let client = DiscoveryClient::new(discovery_config(addr)).unwrap();
    let result = client.discover("payment-api").await;
    assert!(result.is_empty());
    assert_eq!(result.total, 0);
}

#[tokio::test]
async fn test_cache_discovers_once_per_selector() {
    let (addr, log) = start_mock_backend(|req| match req.path.as_str() {
        "/api/v1/series" => MockResponse::ok(series_body("payment-api", &["http_requests_total"])),
        _ => MockResponse::ok(r#"{"status":"success","data":{}}"#),
    })
    .await;

    let client = DiscoveryClient::new(discovery_config(addr)).unwrap();
    let cache = DiscoveryCache::new();
    let first = cache.get_or_discover(&client, "payment-api").await;
    let second = cache.get_or_discover(&client, "payment-api").await;

    assert!(first.unavailable.is_none());
    assert!(Arc::ptr_eq(&first.snapshot, &second.snapshot));
    assert_eq!(log.count("/api/v1/series"), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_slow_metadata_keeps_series() {
    let (addr, _log) = start_mock_backend(|req| match req.path.as_str() {
        "/api/v1/series" => MockResponse::ok(series_body(
            "payment-api",
            &["http_requests_total", "pg_stat_activity_count"],
        )),
        "/api/v1/metadata" => {
            MockResponse::ok(r#"{"status":"success","data":{}}"#).delayed(Duration::from_secs(10))
        }
        _ => MockResponse::not_found(),
    })
    .await;

    let mut config = discovery_config(addr);
    config.request_timeout_secs = 1;
    config.deadline_secs = 3;
    let client = DiscoveryClient::new(config).unwrap();

    let started = std::time::Instant::now();
    let result = client.try_discover("payment-api").await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(result.total, 2);
    // Untyped, so the type comes from the name.
    let requests = result.get("http_requests_total").unwrap();
    assert_eq!(requests.metric_type, MetricType::Counter);
    assert!(requests.help.is_none());
    assert_eq!(result.get("pg_stat_activity_count").unwrap().technology, "postgresql");
}

#[tokio::test]
async fn test_failed_metadata_degrades_one_metric() {
    let (addr, log) = start_mock_backend(|req| match req.path.as_str() {
        "/api/v1/series" => MockResponse::ok(series_body(
            "payment-api",
            &["http_requests_total", "process_resident_memory_bytes"],
        )),
        "/api/v1/metadata" => match req.query.get("metric").map(String::as_str) {
            Some("http_requests_total") => MockResponse::status(500, "boom"),
            Some("process_resident_memory_bytes") => MockResponse::ok(metadata_body(
                "process_resident_memory_bytes",
                "gauge",
                "Resident memory.",
            )),
            _ => MockResponse::not_found(),
        },
        _ => MockResponse::not_found(),
    })
    .await;

    let client = DiscoveryClient::new(discovery_config(addr)).unwrap();
    let result = client.try_discover("payment-api").await.unwrap();

    assert_eq!(result.total, 2);
    let requests = result.get("http_requests_total").unwrap();
    assert!(requests.help.is_none());
    assert_eq!(requests.metric_type, MetricType::Counter);
    let memory = result.get("process_resident_memory_bytes").unwrap();
    assert_eq!(memory.metric_type, MetricType::Gauge);
    assert_eq!(memory.help.as_deref(), Some("Resident memory."));
    // The failing lookup was retried, the series call was not.
    assert_eq!(log.count("/api/v1/series"), 1);
    assert_eq!(log.count("/api/v1/metadata"), 4);
}
