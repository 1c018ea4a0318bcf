//! Draft assembly: dashboard metadata and template panel conversion.
//!
//! # Responsibilities
//! - Pick the service-type template (alias-aware, with a default)
//! - Resolve template intents through the `MetricResolver`
//! - Turn `PanelTemplate`s into live panels or guidance placeholders
//! - Collect every non-fatal condition as a `BuildWarning`
//!
//! All query text produced here still carries `$service`.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::DashboardConfig;
use crate::context::ServiceContext;
use crate::dashboard::model::{Dashboard, Panel, PanelShape, TemplateVariable};
use crate::error::{BuildWarning, WarningKind};
use crate::observability::metrics;
use crate::resolver::{MetricResolver, ResolvedSet};
use crate::templates::template::{bind_intents, intent_refs};
use crate::templates::{LevelFilter, PanelTemplate, ResolvedTemplate, TemplateRegistry};

/// Namespace for dashboard uids (UUIDv5 of service and environment).
const UID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_52a4_3b0e_5d7a_9c21_84e0_d3b6_71f5);

pub struct PanelBuilder<'a> {
    registry: &'a TemplateRegistry,
    resolver: MetricResolver<'a>,
    config: &'a DashboardConfig,
    warnings: Vec<BuildWarning>,
}

impl<'a> PanelBuilder<'a> {
    pub fn new(
        registry: &'a TemplateRegistry,
        resolver: MetricResolver<'a>,
        config: &'a DashboardConfig,
    ) -> Self {
        Self {
            registry,
            resolver,
            config,
            warnings: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'a TemplateRegistry {
        self.registry
    }

    pub fn config(&self) -> &'a DashboardConfig {
        self.config
    }

    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let warning = BuildWarning::new(kind, message);
        tracing::debug!(warning = %warning, "Build warning");
        self.warnings.push(warning);
    }

    pub fn into_warnings(self) -> Vec<BuildWarning> {
        self.warnings
    }

    /// Service-type template for `ctx`, falling back to the configured default
    /// when the declared type is unknown.
    pub fn service_template(&mut self, ctx: &ServiceContext) -> Option<Arc<ResolvedTemplate>> {
        if let Some(found) = self.registry.service_type(&ctx.service_type, LevelFilter::All) {
            return Some(found);
        }
        let default = &self.config.default_service_type;
        self.warn(
            WarningKind::Configuration,
            format!(
                "unknown service type '{}', using '{}'",
                ctx.service_type, default
            ),
        );
        let fallback = self.registry.service_type(default, LevelFilter::All);
        if fallback.is_none() {
            self.warn(
                WarningKind::Configuration,
                format!("default service type '{}' is not in the catalog", default),
            );
        }
        fallback
    }

    /// Resolve every intent of `template`.
    pub fn resolve(&self, template: &ResolvedTemplate) -> ResolvedSet {
        let resolved = self.resolver.resolve_all(&template.intents);
        for entry in resolved.iter() {
            metrics::record_resolution(entry.kind.as_str());
        }
        tracing::debug!(
            template = %template.name,
            resolutions = ?resolved.tally(),
            "Intents resolved"
        );
        resolved
    }

    /// Convert one template panel.
    ///
    /// Queries whose intents all resolved become targets. When no query
    /// survives the panel turns into a guidance placeholder naming the missing
    /// intents. A template panel with neither queries nor guidance is dropped.
    pub fn from_template(
        &mut self,
        template: &PanelTemplate,
        resolved: &ResolvedSet,
        owner: &str,
    ) -> Option<Panel> {
        if template.queries.is_empty() {
            return match &template.guidance {
                Some(message) => Some(Panel::guidance(
                    template.title.clone(),
                    template.kind,
                    template.width,
                    template.height,
                    message.clone(),
                )),
                None => {
                    self.warn(
                        WarningKind::PanelConversion,
                        format!("{}: panel '{}' has no queries", owner, template.title),
                    );
                    None
                }
            };
        }

        let mut panel = Panel::new(
            template.title.clone(),
            PanelShape::for_kind(template.kind),
            template.width,
            template.height,
        );
        panel.unit = template.unit.clone();
        panel.decimals = template.decimals;
        panel.min = template.min;
        panel.max = template.max;
        panel.thresholds = template.thresholds.clone();
        panel.description = template.description.clone();

        let mut missing: Vec<&str> = Vec::new();
        for query in &template.queries {
            let unresolved: Vec<&str> = query
                .intent_refs()
                .into_iter()
                .filter(|id| resolved.concrete(id).is_none())
                .collect();
            if unresolved.is_empty() {
                panel.push_target(bind_intents(&query.expr, |id| resolved.concrete(id)), query.legend.clone());
            } else {
                for id in unresolved {
                    if !missing.contains(&id) {
                        missing.push(id);
                    }
                }
            }
        }

        if panel.targets.is_empty() {
            let list = missing.join(", ");
            self.warn(
                WarningKind::MissingMetrics,
                format!("{}: panel '{}' has no metrics for {}", owner, template.title, list),
            );
            let message = match &template.guidance {
                Some(hint) => format!("No metrics found for {}. {}", list, hint),
                None => format!("No metrics found for {}.", list),
            };
            return Some(Panel::guidance(
                template.title.clone(),
                template.kind,
                template.width,
                template.height,
                message,
            ));
        }
        if !missing.is_empty() {
            tracing::debug!(
                owner = %owner,
                panel = %template.title,
                missing = %missing.join(", "),
                "Dropped queries with unresolved intents"
            );
        }
        Some(panel)
    }

    /// Bind intent placeholders in free-standing query text (SLO formulas).
    /// Returns the intents that could not be bound on failure.
    pub fn bind(&self, expr: &str, resolved: &ResolvedSet) -> Result<String, Vec<String>> {
        let missing: Vec<String> = intent_refs(expr)
            .into_iter()
            .filter(|id| resolved.concrete(id).is_none())
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            Ok(bind_intents(expr, |id| resolved.concrete(id)))
        } else {
            Err(missing)
        }
    }
}

/// Dashboard shell: identity, tags, time settings and the datasource variable.
pub fn dashboard_shell(ctx: &ServiceContext, config: &DashboardConfig) -> Dashboard {
    let mut tags: Vec<String> = Vec::new();
    let candidates = [
        Some(ctx.team.as_str()),
        Some(ctx.tier.as_str()),
        Some(ctx.service_type.as_str()),
        ctx.environment.as_deref(),
    ];
    for tag in candidates.into_iter().flatten() {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    Dashboard {
        uid: dashboard_uid(ctx),
        title: format!("{} - Service Dashboard", ctx.name),
        tags,
        timezone: config.timezone.clone(),
        editable: config.editable,
        time_from: config.time_from.clone(),
        time_to: config.time_to.clone(),
        refresh: config.refresh.clone(),
        schema_version: config.schema_version,
        variables: vec![TemplateVariable::datasource()],
        rows: Vec::new(),
        panels: Vec::new(),
    }
}

/// Stable across rebuilds of the same service in the same environment.
pub fn dashboard_uid(ctx: &ServiceContext) -> String {
    let key = format!("{}/{}", ctx.name, ctx.environment.as_deref().unwrap_or(""));
    Uuid::new_v5(&UID_NAMESPACE, key.as_bytes()).to_string()
}
