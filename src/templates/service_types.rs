//! Built-in service-type templates.
//!
//! Each service type contributes intents, named SLO formulas and the panels of
//! the "Service Health" row. `{quantile}` in latency formulas is bound per
//! series by the SLO panel builder.

use crate::templates::intent::MetricIntent;
use crate::templates::template::{PanelTemplate, Template, ThresholdStep};

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

pub fn all() -> Vec<Template> {
    vec![base(), api(), gateway(), worker(), stream()]
}

/// Process-level intents every service type inherits.
fn base() -> Template {
    Template::service_type("base", "Base Service")
        .intent(
            MetricIntent::counter("process.cpu.time", "s")
                .recommended()
                .technology_group("runtime")
                .candidates(["process_cpu_seconds_total"]),
        )
        .intent(
            MetricIntent::gauge("process.memory.resident", "By")
                .recommended()
                .technology_group("runtime")
                .candidates(["process_resident_memory_bytes"]),
        )
}

fn api() -> Template {
    Template::service_type("api", "API Service")
        .extends("base")
        .aliases(&["service", "web", "rest", "http", "grpc"])
        .intent(
            MetricIntent::counter("http.server.request.count", "{request}")
                .candidates([
                    "http_requests_total",
                    "http_server_requests_seconds_count",
                    "http_server_request_duration_seconds_count",
                ])
                .attribute("status", true, &["200", "503"])
                .attribute("route", false, &["/v1/payments"])
                .used_by("availability")
                .used_by("error_rate"),
        )
        .intent(
            MetricIntent::histogram("http.server.request.duration", "s")
                .candidates([
                    "http_request_duration_seconds",
                    "http_server_request_duration_seconds",
                    "http_server_requests_seconds",
                ])
                .buckets(LATENCY_BUCKETS)
                .used_by("latency"),
        )
        .intent(
            MetricIntent::gauge("http.server.active_requests", "{request}")
                .recommended()
                .candidates(["http_requests_in_flight", "http_server_active_requests"]),
        )
        .formula(
            "availability",
            r#"sum(rate({{http.server.request.count}}{service="$service",status!~"5.."}[5m])) / sum(rate({{http.server.request.count}}{service="$service"}[5m])) * 100"#,
        )
        .formula(
            "error_rate",
            r#"sum(rate({{http.server.request.count}}{service="$service",status=~"5.."}[5m])) / sum(rate({{http.server.request.count}}{service="$service"}[5m])) * 100"#,
        )
        .formula(
            "latency",
            r#"histogram_quantile({quantile}, sum by (le) (rate({{http.server.request.duration}}_bucket{service="$service"}[5m]))) * 1000"#,
        )
        .panel(
            PanelTemplate::timeseries("Request Rate")
                .unit("reqps")
                .size(8, 8)
                .query(
                    r#"sum(rate({{http.server.request.count}}{service="$service"}[5m]))"#,
                    "requests/s",
                )
                .guidance("Instrument HTTP handlers with a request counter labelled service=\"$service\"."),
        )
        .panel(
            PanelTemplate::timeseries("Error Rate")
                .unit("percent")
                .size(8, 8)
                .thresholds(vec![
                    ThresholdStep::base("green"),
                    ThresholdStep::at("yellow", 1.0),
                    ThresholdStep::at("red", 5.0),
                ])
                .query(
                    r#"sum(rate({{http.server.request.count}}{service="$service",status=~"5.."}[5m])) / sum(rate({{http.server.request.count}}{service="$service"}[5m])) * 100"#,
                    "5xx %",
                )
                .guidance("Expose a status label on the HTTP request counter to chart error rate."),
        )
        .panel(
            PanelTemplate::timeseries("Latency")
                .unit("ms")
                .size(8, 8)
                .query(
                    r#"histogram_quantile(0.50, sum by (le) (rate({{http.server.request.duration}}_bucket{service="$service"}[5m]))) * 1000"#,
                    "p50",
                )
                .query(
                    r#"histogram_quantile(0.95, sum by (le) (rate({{http.server.request.duration}}_bucket{service="$service"}[5m]))) * 1000"#,
                    "p95",
                )
                .query(
                    r#"histogram_quantile(0.99, sum by (le) (rate({{http.server.request.duration}}_bucket{service="$service"}[5m]))) * 1000"#,
                    "p99",
                )
                .guidance("Record request duration as a histogram to chart latency percentiles."),
        )
}

/// Edge proxies: same health view as an API, with ingress-controller names first.
fn gateway() -> Template {
    Template::service_type("gateway", "Gateway")
        .extends("api")
        .aliases(&["proxy", "ingress", "edge"])
        .intent(
            MetricIntent::counter("http.server.request.count", "{request}")
                .candidates([
                    "nginx_ingress_controller_requests",
                    "envoy_http_downstream_rq_total",
                    "http_requests_total",
                ])
                .attribute("status", true, &["200", "503"])
                .used_by("availability")
                .used_by("error_rate"),
        )
        .intent(
            MetricIntent::counter("http.gateway.upstream.failures", "{connection}")
                .candidates([
                    "envoy_cluster_upstream_cx_connect_fail",
                    "haproxy_backend_connection_errors_total",
                ]),
        )
        .panel(
            PanelTemplate::timeseries("Upstream Connection Failures")
                .unit("ops")
                .size(24, 8)
                .query(
                    r#"sum(rate({{http.gateway.upstream.failures}}{service="$service"}[5m]))"#,
                    "failures/s",
                )
                .guidance("Export upstream connection failure counters from the proxy."),
        )
}

fn worker() -> Template {
    Template::service_type("worker", "Background Worker")
        .extends("base")
        .aliases(&["background-job", "job", "batch", "cron", "queue-worker"])
        .intent(
            MetricIntent::counter("worker.jobs.processed", "{job}")
                .candidates([
                    "jobs_processed_total",
                    "worker_jobs_processed_total",
                    "celery_tasks_total",
                ])
                .attribute("queue", false, &["default", "billing"])
                .used_by("availability"),
        )
        .intent(
            MetricIntent::counter("worker.jobs.failed", "{job}")
                .candidates([
                    "jobs_failed_total",
                    "worker_jobs_failed_total",
                    "celery_tasks_failed_total",
                ])
                .used_by("availability")
                .used_by("error_rate"),
        )
        .intent(
            MetricIntent::histogram("worker.job.duration", "s")
                .candidates(["job_duration_seconds", "worker_job_duration_seconds"])
                .buckets(&[0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0])
                .used_by("latency"),
        )
        .intent(
            MetricIntent::gauge("worker.queue.depth", "{job}")
                .recommended()
                .candidates(["jobs_queued", "worker_queue_depth"]),
        )
        .formula(
            "availability",
            r#"(1 - (sum(rate({{worker.jobs.failed}}{service="$service"}[5m])) / sum(rate({{worker.jobs.processed}}{service="$service"}[5m])))) * 100"#,
        )
        .formula(
            "error_rate",
            r#"sum(rate({{worker.jobs.failed}}{service="$service"}[5m])) / sum(rate({{worker.jobs.processed}}{service="$service"}[5m])) * 100"#,
        )
        .formula(
            "latency",
            r#"histogram_quantile({quantile}, sum by (le) (rate({{worker.job.duration}}_bucket{service="$service"}[5m]))) * 1000"#,
        )
        .panel(
            PanelTemplate::timeseries("Job Throughput")
                .unit("ops")
                .size(8, 8)
                .query(
                    r#"sum(rate({{worker.jobs.processed}}{service="$service"}[5m]))"#,
                    "jobs/s",
                ),
        )
        .panel(
            PanelTemplate::timeseries("Job Failure Rate")
                .unit("percent")
                .size(8, 8)
                .query(
                    r#"sum(rate({{worker.jobs.failed}}{service="$service"}[5m])) / sum(rate({{worker.jobs.processed}}{service="$service"}[5m])) * 100"#,
                    "failed %",
                ),
        )
        .panel(
            PanelTemplate::timeseries("Job Duration")
                .unit("ms")
                .size(8, 8)
                .query(
                    r#"histogram_quantile(0.50, sum by (le) (rate({{worker.job.duration}}_bucket{service="$service"}[5m]))) * 1000"#,
                    "p50",
                )
                .query(
                    r#"histogram_quantile(0.99, sum by (le) (rate({{worker.job.duration}}_bucket{service="$service"}[5m]))) * 1000"#,
                    "p99",
                ),
        )
}

fn stream() -> Template {
    Template::service_type("stream", "Stream Processor")
        .extends("base")
        .aliases(&["stream-processor", "consumer", "event-processor"])
        .intent(
            MetricIntent::counter("stream.events.processed", "{event}")
                .candidates([
                    "events_processed_total",
                    "messages_processed_total",
                    "stream_records_processed_total",
                ])
                .used_by("availability"),
        )
        .intent(
            MetricIntent::counter("stream.events.failed", "{event}")
                .candidates(["events_failed_total", "messages_failed_total"])
                .used_by("availability")
                .used_by("error_rate"),
        )
        .intent(
            MetricIntent::histogram("stream.processing.duration", "s")
                .candidates([
                    "event_processing_duration_seconds",
                    "message_processing_duration_seconds",
                ])
                .used_by("latency"),
        )
        .intent(
            MetricIntent::gauge("stream.consumer.lag", "{message}")
                .recommended()
                .candidates(["consumer_lag", "stream_consumer_lag"]),
        )
        .formula(
            "availability",
            r#"(1 - (sum(rate({{stream.events.failed}}{service="$service"}[5m])) / sum(rate({{stream.events.processed}}{service="$service"}[5m])))) * 100"#,
        )
        .formula(
            "error_rate",
            r#"sum(rate({{stream.events.failed}}{service="$service"}[5m])) / sum(rate({{stream.events.processed}}{service="$service"}[5m])) * 100"#,
        )
        .formula(
            "latency",
            r#"histogram_quantile({quantile}, sum by (le) (rate({{stream.processing.duration}}_bucket{service="$service"}[5m]))) * 1000"#,
        )
        .panel(
            PanelTemplate::timeseries("Throughput")
                .unit("ops")
                .size(8, 8)
                .query(
                    r#"sum(rate({{stream.events.processed}}{service="$service"}[5m]))"#,
                    "events/s",
                ),
        )
        .panel(
            PanelTemplate::timeseries("Processing Errors")
                .unit("ops")
                .size(8, 8)
                .query(
                    r#"sum(rate({{stream.events.failed}}{service="$service"}[5m]))"#,
                    "errors/s",
                ),
        )
        .panel(
            PanelTemplate::timeseries("Processing Latency")
                .unit("ms")
                .size(8, 8)
                .query(
                    r#"histogram_quantile(0.99, sum by (le) (rate({{stream.processing.duration}}_bucket{service="$service"}[5m]))) * 1000"#,
                    "p99",
                ),
        )
        .panel(
            PanelTemplate::timeseries("Consumer Lag")
                .unit("short")
                .size(24, 8)
                .query(r#"max({{stream.consumer.lag}}{service="$service"})"#, "lag")
                .guidance("Export consumer lag per partition to chart backlog growth."),
        )
}
