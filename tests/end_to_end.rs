//! Full builds: input JSON through discovery, pipeline, render and push.

use std::net::SocketAddr;

use serde_json::Value;

use service_dashboards::config::{BatchConfig, DashboardConfig, GrafanaConfig};
use service_dashboards::dashboard::health::HEALTH_ROW;
use service_dashboards::dashboard::slo::SLO_ROW;
use service_dashboards::dashboard::{BatchRunner, BuildOutput};
use service_dashboards::discovery::DiscoveryClient;
use service_dashboards::output::{DashboardEnvelope, GrafanaClient};
use service_dashboards::{ServiceInput, WarningKind};

mod common;
use common::{discovery_config, series_body, start_mock_backend, MockResponse};

const PAYMENT_API: &str = r#"{
  "service": {
    "name": "payment-api",
    "team": "payments",
    "tier": "critical",
    "type": "api"
  },
  "resources": [
    {
      "kind": "SLO",
      "spec": { "name": "Availability", "objective": 99.9, "window": "30d", "indicator": { "type": "availability" } }
    },
    {
      "kind": "SLO",
      "spec": { "objective": 99.0, "indicator": { "type": "latency", "threshold_ms": 300 } }
    },
    {
      "kind": "Dependencies",
      "spec": {
        "databases": [{ "type": "postgresql", "name": "orders-db" }],
        "caches": [{ "type": "redis", "name": "session-cache" }]
      }
    },
    { "kind": "PagerDuty", "spec": { "escalation_policy": "payments" } }
  ]
}"#;

const PAYMENT_API_METRICS: &[&str] = &[
    "http_requests_total",
    "http_request_duration_seconds_bucket",
    "http_request_duration_seconds_count",
    "http_request_duration_seconds_sum",
    "pg_stat_activity_count",
    "pg_stat_database_xact_commit",
    "pg_stat_database_xact_rollback",
];

fn payment_api() -> ServiceInput {
    serde_json::from_str(PAYMENT_API).unwrap()
}

async fn prometheus() -> SocketAddr {
    let (addr, _log) = start_mock_backend(|req| match req.path.as_str() {
        "/api/v1/series" => MockResponse::ok(series_body("payment-api", PAYMENT_API_METRICS)),
        "/api/v1/metadata" => MockResponse::ok(r#"{"status":"success","data":{}}"#),
        _ => MockResponse::not_found(),
    })
    .await;
    addr
}

fn runner(addr: Option<SocketAddr>) -> BatchRunner {
    let client = addr.map(|a| DiscoveryClient::new(discovery_config(a)).unwrap());
    BatchRunner::new(DashboardConfig::default(), &BatchConfig::default(), client)
}

fn row_titles(json: &Value) -> Vec<String> {
    json["panels"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|p| p["type"] == "row")
        .map(|p| p["title"].as_str().unwrap().to_string())
        .collect()
}

fn assert_payment_api(built: &BuildOutput) {
    let json = &built.json;
    assert_eq!(json["title"], "payment-api - Service Dashboard");

    let tags: Vec<&str> = json["tags"].as_array().unwrap().iter().map(|t| t.as_str().unwrap()).collect();
    for tag in ["payments", "critical", "api"] {
        assert!(tags.contains(&tag), "missing tag {tag}");
    }

    let dashboard = &built.dashboard;
    assert!(!dashboard.row(SLO_ROW).unwrap().panels.is_empty());
    assert_eq!(dashboard.row(HEALTH_ROW).unwrap().panels.len(), 3);
    let postgres = dashboard.rows.iter().find(|r| r.title.starts_with("PostgreSQL")).unwrap();
    assert!(!postgres.panels.is_empty());

    let text = serde_json::to_string(json).unwrap();
    assert!(!text.contains("$service"));
    assert!(!text.contains("{{"));
}

#[tokio::test]
async fn test_payment_api_with_discovery() {
    let addr = prometheus().await;
    let built = runner(Some(addr)).build(&payment_api()).await.unwrap();
    assert_payment_api(&built);

    // No Redis metric was discovered: every conventional Redis panel is
    // dropped and the emptied row goes with them.
    assert_eq!(
        row_titles(&built.json),
        vec![SLO_ROW, HEALTH_ROW, "PostgreSQL (orders-db)"]
    );
    let dropped: Vec<&str> = built
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::PanelDropped)
        .map(|w| w.message.as_str())
        .collect();
    assert!(dropped.iter().any(|m| m.contains("'Connected Clients'")), "{dropped:?}");
    assert!(dropped.iter().any(|m| m.contains("'Cache Hit Ratio'")), "{dropped:?}");

    // Every live panel queries metrics that exist.
    for panel in built.dashboard.all_panels() {
        for target in &panel.targets {
            assert!(target.expr.contains(r#"service="payment-api""#), "{}", target.expr);
        }
    }
    assert!(!built.warnings.iter().any(|w| w.kind == WarningKind::DiscoveryUnavailable));
    assert!(!built.warnings.iter().any(|w| w.kind == WarningKind::ValidationSkipped));
}

#[tokio::test]
async fn test_payment_api_without_discovery() {
    let built = runner(None).build(&payment_api()).await.unwrap();
    assert_payment_api(&built);
    assert!(built.warnings.iter().any(|w| w.kind == WarningKind::ValidationSkipped));
    // Naming conventions keep every health panel live.
    let health = built.dashboard.row(HEALTH_ROW).unwrap();
    assert!(health.panels.iter().all(|p| !p.is_guidance()));
}

#[tokio::test]
async fn test_unreachable_backend_degrades() {
    // Bind and drop to get a port nothing listens on.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let built = runner(Some(addr)).build(&payment_api()).await.unwrap();
    assert_payment_api(&built);
    let unavailable = built
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::DiscoveryUnavailable)
        .count();
    assert_eq!(unavailable, 1);
}

#[tokio::test]
async fn test_rebuild_is_byte_identical() {
    let addr = prometheus().await;
    let first = runner(Some(addr)).build(&payment_api()).await.unwrap();
    let second = runner(Some(addr)).build(&payment_api()).await.unwrap();
    assert_eq!(
        serde_json::to_string_pretty(&first.json).unwrap(),
        serde_json::to_string_pretty(&second.json).unwrap()
    );
}

#[tokio::test]
async fn test_batch_shares_discovery() {
    let addr = prometheus().await;
    let runner = runner(Some(addr));
    let mut other = payment_api();
    other.service.name = "refund-api".into();
    let inputs = vec![payment_api(), other, payment_api()];

    let results = runner.run(inputs).await;
    let titles: Vec<String> = results
        .iter()
        .map(|r| r.as_ref().unwrap().json["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        titles,
        vec![
            "payment-api - Service Dashboard",
            "refund-api - Service Dashboard",
            "payment-api - Service Dashboard"
        ]
    );
    assert_eq!(runner.cache().len(), 2);
}

#[tokio::test]
async fn test_push_envelope() {
    let (addr, log) = start_mock_backend(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/api/dashboards/db") => MockResponse::ok(
            r#"{"id":7,"uid":"abc","url":"/d/abc/payment-api","status":"success","version":3}"#,
        ),
        _ => MockResponse::not_found(),
    })
    .await;

    let built = runner(None).build(&payment_api()).await.unwrap();
    let config = GrafanaConfig {
        url: format!("http://{}", addr),
        folder_uid: Some("payments".into()),
        ..GrafanaConfig::default()
    };
    let client = GrafanaClient::with_token(&config, "test-token").unwrap();
    let envelope = DashboardEnvelope::new(built.json.clone(), &config, "Generated for payment-api");
    let saved = client.push(&envelope).await.unwrap();
    assert_eq!(saved.uid, "abc");
    assert_eq!(saved.version, 3);

    let request = log.all().pop().unwrap();
    assert_eq!(request.headers["authorization"], "Bearer test-token");
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["overwrite"], true);
    assert_eq!(body["folderUid"], "payments");
    assert_eq!(body["message"], "Generated for payment-api");
    assert_eq!(body["dashboard"]["title"], "payment-api - Service Dashboard");
}

#[tokio::test]
async fn test_push_rejection_is_reported() {
    let (addr, _log) = start_mock_backend(|_| MockResponse::status(401, r#"{"message":"invalid API key"}"#)).await;
    let config = GrafanaConfig {
        url: format!("http://{}", addr),
        ..GrafanaConfig::default()
    };
    let client = GrafanaClient::with_token(&config, "bad").unwrap();
    let envelope = DashboardEnvelope::new(serde_json::json!({}), &config, "m");
    let err = client.push(&envelope).await.unwrap_err();
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_invalid_service_skips_discovery() {
    let (addr, log) = start_mock_backend(|_| MockResponse::ok(r#"{"status":"success","data":[]}"#)).await;
    let client = DiscoveryClient::new(discovery_config(addr)).unwrap();
    let runner = BatchRunner::new(DashboardConfig::default(), &BatchConfig::default(), Some(client));

    let mut bad = payment_api();
    bad.service.name = "bad name!".into();
    let err = runner.build(&bad).await.unwrap_err();
    assert!(err.to_string().contains("bad name!"), "{err}");
    assert!(log.all().is_empty());
    assert!(runner.cache().is_empty());
}
