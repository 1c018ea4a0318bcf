//! Per-build state machine.
//!
//! # Data Flow
//! ```text
//! Draft      rows assembled, query text still carries $service
//!   → Resolved   one global $service substitution
//!   → Validated  panels checked against discovered metrics
//!   → LaidOut    ids and grid positions frozen
//!   → BuildOutput  rendered JSON + accumulated warnings
//! ```
//!
//! # Design Decisions
//! - Each stage is its own type; transitions consume the previous stage
//! - Only an invalid service identity stops a build; everything else is a warning
//! - No stage exposes a partially built dashboard for mutation

use std::sync::Arc;

use serde_json::Value;

use crate::config::DashboardConfig;
use crate::context::types::{dependencies, metric_overrides, slos};
use crate::context::{Resource, ServiceContext, ServiceInput};
use crate::dashboard::builder::{dashboard_shell, PanelBuilder};
use crate::dashboard::dependencies::dependency_rows;
use crate::dashboard::health::health_row;
use crate::dashboard::layout::GridLayoutEngine;
use crate::dashboard::model::{Dashboard, Row};
use crate::dashboard::render::render;
use crate::dashboard::slo::{slo_panels, SLO_ROW};
use crate::dashboard::validator::validate_dashboard;
use crate::discovery::{DiscoveryOutcome, DiscoveryResult};
use crate::error::{BuildResult, BuildWarning, WarningKind};
use crate::observability::metrics;
use crate::resolver::MetricResolver;
use crate::templates::TemplateRegistry;

/// State shared by every stage.
#[derive(Debug)]
struct Stage {
    service: String,
    service_type: String,
    dashboard: Dashboard,
    discovery: Arc<DiscoveryResult>,
    warnings: Vec<BuildWarning>,
}

/// Rows assembled from templates; placeholders unbound.
#[derive(Debug)]
pub struct Draft(Stage);

/// `$service` substituted everywhere.
#[derive(Debug)]
pub struct Resolved(Stage);

/// Panels without backing metrics removed.
#[derive(Debug)]
pub struct Validated(Stage);

/// Ids and positions assigned.
#[derive(Debug)]
pub struct LaidOut(Stage);

/// Final artifact of one build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub dashboard: Dashboard,
    pub json: Value,
    pub warnings: Vec<BuildWarning>,
}

impl Draft {
    pub fn new(
        ctx: &ServiceContext,
        resources: &[Resource],
        discovery: &DiscoveryOutcome,
        registry: &TemplateRegistry,
        config: &DashboardConfig,
    ) -> BuildResult<Self> {
        ctx.validate()?;

        let mut warnings = Vec::new();
        if let Some(reason) = &discovery.unavailable {
            tracing::warn!(service = %ctx.name, reason = %reason, "Discovery unavailable, using naming conventions");
            warnings.push(BuildWarning::new(
                WarningKind::DiscoveryUnavailable,
                format!("discovery unavailable: {}", reason),
            ));
        }

        let overrides = metric_overrides(resources);
        let resolver = MetricResolver::new(&overrides, Some(discovery.snapshot.as_ref()));
        let mut builder = PanelBuilder::new(registry, resolver, config);
        let mut dashboard = dashboard_shell(ctx, config);

        let mut service_type = ctx.service_type.clone();
        if let Some(template) = builder.service_template(ctx) {
            service_type = template.name.clone();
            let resolved = builder.resolve(&template);

            let slo_specs = slos(resources);
            let panels = slo_panels(&mut builder, &slo_specs, &template, &resolved);
            if !panels.is_empty() {
                let mut row = Row::new(SLO_ROW);
                row.panels = panels;
                dashboard.rows.push(row);
            }

            if let Some(row) = health_row(&mut builder, &template, &resolved) {
                dashboard.rows.push(row);
            }
        }

        let deps = dependencies(resources);
        dashboard.rows.extend(dependency_rows(&mut builder, &deps));

        warnings.extend(builder.into_warnings());
        tracing::debug!(
            service = %ctx.name,
            rows = dashboard.rows.len(),
            panels = dashboard.panel_count(),
            "Draft assembled"
        );

        Ok(Self(Stage {
            service: ctx.name.clone(),
            service_type,
            dashboard,
            discovery: Arc::clone(&discovery.snapshot),
            warnings,
        }))
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.0.dashboard
    }

    /// Replace every `$service` with the service name.
    pub fn resolve(mut self) -> Resolved {
        let service = self.0.service.clone();
        self.0.dashboard.substitute_service(&service);
        Resolved(self.0)
    }
}

impl Resolved {
    pub fn validate(mut self) -> Validated {
        let warnings = validate_dashboard(&mut self.0.dashboard, &self.0.discovery);
        self.0.warnings.extend(warnings);
        Validated(self.0)
    }
}

impl Validated {
    pub fn finalize(mut self) -> LaidOut {
        GridLayoutEngine::finalize(&mut self.0.dashboard);
        metrics::record_dashboard_built(&self.0.service_type);
        LaidOut(self.0)
    }
}

impl LaidOut {
    pub fn dashboard(&self) -> &Dashboard {
        &self.0.dashboard
    }

    pub fn warnings(&self) -> &[BuildWarning] {
        &self.0.warnings
    }

    pub fn serialize(self) -> BuildOutput {
        let stage = self.0;
        let json = render(&stage.dashboard);
        tracing::info!(
            service = %stage.service,
            panels = stage.dashboard.panel_count(),
            warnings = stage.warnings.len(),
            "Dashboard built"
        );
        BuildOutput {
            dashboard: stage.dashboard,
            json,
            warnings: stage.warnings,
        }
    }
}

/// Run every stage for one service.
pub fn build_dashboard(
    input: &ServiceInput,
    discovery: &DiscoveryOutcome,
    registry: &TemplateRegistry,
    config: &DashboardConfig,
) -> BuildResult<BuildOutput> {
    Ok(Draft::new(&input.service, &input.resources, discovery, registry, config)?
        .resolve()
        .validate()
        .finalize()
        .serialize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{DependenciesSpec, DependencyRef, SloSpec};
    use crate::dashboard::health::HEALTH_ROW;
    use crate::discovery::{DiscoveredMetric, DiscoveryResult};
    use crate::error::BuildError;

    fn input() -> ServiceInput {
        ServiceInput {
            service: ServiceContext::new("payment-api", "payments", "critical", "api"),
            resources: vec![
                Resource::Slo(SloSpec::new("availability", 99.9)),
                Resource::Dependencies(DependenciesSpec {
                    databases: vec![DependencyRef::new("postgresql")],
                    ..DependenciesSpec::default()
                }),
            ],
        }
    }

    fn build(discovery: &DiscoveryOutcome) -> BuildOutput {
        build_dashboard(
            &input(),
            discovery,
            TemplateRegistry::global(),
            &DashboardConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_stages_in_order() {
        let draft = Draft::new(
            &input().service,
            &input().resources,
            &DiscoveryOutcome::skipped(),
            TemplateRegistry::global(),
            &DashboardConfig::default(),
        )
        .unwrap();
        assert!(draft
            .dashboard()
            .all_panels()
            .flat_map(|p| p.targets.iter())
            .any(|t| t.expr.contains("$service")));
        assert!(draft.dashboard().all_panels().all(|p| p.id == 0));

        let laid_out = draft.resolve().validate().finalize();
        assert!(laid_out.dashboard().all_panels().all(|p| p.id > 0));
        assert_eq!(laid_out.warnings()[0].kind, WarningKind::ValidationSkipped);
        let output = laid_out.serialize();
        assert!(!output.json.to_string().contains("$service"));
    }

    #[test]
    fn test_rows_without_discovery() {
        let output = build(&DiscoveryOutcome::skipped());
        let titles: Vec<&str> = output.dashboard.rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec![SLO_ROW, HEALTH_ROW, "PostgreSQL"]);
        assert_eq!(output.dashboard.row(HEALTH_ROW).unwrap().panels.len(), 3);
    }

    #[test]
    fn test_unavailable_discovery_warns_once() {
        let output = build(&DiscoveryOutcome::unavailable("connection refused"));
        let count = output
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::DiscoveryUnavailable)
            .count();
        assert_eq!(count, 1);
        assert!(output.dashboard.panel_count() > 0);
    }

    #[test]
    fn test_discovery_drives_validation() {
        let snapshot = DiscoveryResult::new(vec![
            DiscoveredMetric::new("http_requests_total"),
            DiscoveredMetric::new("pg_stat_activity_count"),
        ]);
        let output = build(&DiscoveryOutcome::available(snapshot));
        // Latency falls back to the conventional histogram, which the
        // snapshot does not have, so validation drops it.
        let health = output.dashboard.row(HEALTH_ROW).unwrap();
        assert!(health.panels.iter().any(|p| p.title == "Request Rate"));
        assert!(!health.panels.iter().any(|p| p.title == "Latency"));
        assert!(output
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::PanelDropped && w.message.contains("'Latency'")));
        for panel in output.dashboard.all_panels() {
            for target in &panel.targets {
                assert!(!target.expr.contains("{{"), "{}", target.expr);
            }
        }
    }

    #[test]
    fn test_user_text_placeholders_are_substituted() {
        let mut input = input();
        input.service.environment = Some("$service-prod".into());
        input.resources = vec![Resource::Dependencies(DependenciesSpec {
            databases: vec![DependencyRef {
                technology: "postgresql".into(),
                name: Some("$service-db".into()),
            }],
            ..DependenciesSpec::default()
        })];
        let output = build_dashboard(
            &input,
            &DiscoveryOutcome::skipped(),
            TemplateRegistry::global(),
            &DashboardConfig::default(),
        )
        .unwrap();

        assert!(!output.json.to_string().contains("$service"));
        assert!(output.dashboard.row("PostgreSQL (payment-api-db)").is_some());
        assert!(output.dashboard.tags.contains(&"payment-api-prod".to_string()));
    }

    #[test]
    fn test_invalid_service_is_fatal() {
        let mut bad = input();
        bad.service.name = String::new();
        let err = build_dashboard(
            &bad,
            &DiscoveryOutcome::skipped(),
            TemplateRegistry::global(),
            &DashboardConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::InvalidService(_)));
    }

    #[test]
    fn test_idempotent() {
        let a = build(&DiscoveryOutcome::skipped());
        let b = build(&DiscoveryOutcome::skipped());
        assert_eq!(
            serde_json::to_string(&a.json).unwrap(),
            serde_json::to_string(&b.json).unwrap()
        );
    }
}
