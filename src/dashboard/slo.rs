//! SLO panels.
//!
//! Each SLO is shaped by its indicator type:
//! - availability → gauge, red / yellow / green around the objective
//! - latency → p50/p95/p99 timeseries
//! - error-rate → timeseries with budget-relative thresholds
//! - anything else → stat over the user's query, or a guidance panel

use crate::context::{SloKind, SloSpec};
use crate::dashboard::builder::PanelBuilder;
use crate::dashboard::model::{Panel, PanelShape};
use crate::error::WarningKind;
use crate::resolver::ResolvedSet;
use crate::templates::{PanelKind, ResolvedTemplate, ThresholdStep};

pub const SLO_ROW: &str = "SLOs";

const LATENCY_QUANTILES: &[(&str, &str)] = &[("0.50", "p50"), ("0.95", "p95"), ("0.99", "p99")];

/// Error budget in percentage points. Objectives above 50 are success targets
/// (99.9 → 0.1); anything else is already the tolerated error percentage.
pub fn error_budget(objective: f64) -> f64 {
    if objective > 50.0 {
        100.0 - objective
    } else {
        objective
    }
}

pub fn availability_thresholds(objective: f64) -> Vec<ThresholdStep> {
    let budget = 100.0 - objective;
    vec![
        ThresholdStep::base("red"),
        ThresholdStep::at("yellow", round(objective - budget)),
        ThresholdStep::at("green", objective),
    ]
}

pub fn error_rate_thresholds(objective: f64) -> Vec<ThresholdStep> {
    let budget = error_budget(objective);
    vec![
        ThresholdStep::base("green"),
        ThresholdStep::at("yellow", round(budget * 0.75)),
        ThresholdStep::at("red", round(budget)),
    ]
}

/// Trim float noise (99.9 - 0.1 = 99.80000000000001).
fn round(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Panels for every SLO, in declaration order.
pub fn slo_panels(
    builder: &mut PanelBuilder<'_>,
    slos: &[&SloSpec],
    template: &ResolvedTemplate,
    resolved: &ResolvedSet,
) -> Vec<Panel> {
    let mut panels = Vec::with_capacity(slos.len());
    for slo in slos {
        if !(0.0..=100.0).contains(&slo.objective) {
            builder.warn(
                WarningKind::Configuration,
                format!(
                    "SLO '{}' has objective {} outside 0-100, skipped",
                    title(slo),
                    slo.objective
                ),
            );
            continue;
        }
        let panel = match slo.kind() {
            SloKind::Availability => availability(builder, slo, template, resolved),
            SloKind::Latency => latency(builder, slo, template, resolved),
            SloKind::ErrorRate => error_rate(builder, slo, template, resolved),
            SloKind::Other(kind) => custom(builder, slo, &kind),
        };
        panels.push(panel);
    }
    panels
}

fn title(slo: &SloSpec) -> String {
    match &slo.name {
        Some(name) => name.clone(),
        None => match slo.kind() {
            SloKind::Availability => "Availability".to_string(),
            SloKind::Latency => "Latency".to_string(),
            SloKind::ErrorRate => "Error Rate".to_string(),
            SloKind::Other(kind) => kind,
        },
    }
}

fn describe(slo: &SloSpec) -> String {
    format!("Objective {}% over {}", slo.objective, slo.window)
}

/// The SLO's query: the user's override, else the template formula bound to
/// resolved metrics.
fn query(
    builder: &PanelBuilder<'_>,
    slo: &SloSpec,
    formula: &str,
    template: &ResolvedTemplate,
    resolved: &ResolvedSet,
) -> Result<String, String> {
    if let Some(query) = &slo.indicator.query {
        return Ok(query.clone());
    }
    let Some(formula_def) = template.formula(formula) else {
        return Err(format!(
            "Service type '{}' has no {} formula. Set indicator.query to chart this SLO.",
            template.name, formula
        ));
    };
    builder.bind(&formula_def.expr, resolved).map_err(|missing| {
        format!(
            "No metrics found for {}. Set indicator.query or instrument the service.",
            missing.join(", ")
        )
    })
}

fn guidance(builder: &mut PanelBuilder<'_>, slo: &SloSpec, kind: PanelKind, message: String) -> Panel {
    builder.warn(
        WarningKind::MissingMetrics,
        format!("SLO '{}': {}", title(slo), message),
    );
    let mut panel = Panel::guidance(title(slo), kind, 8, 8, message);
    panel.description = Some(describe(slo));
    panel
}

fn availability(
    builder: &mut PanelBuilder<'_>,
    slo: &SloSpec,
    template: &ResolvedTemplate,
    resolved: &ResolvedSet,
) -> Panel {
    let expr = match query(builder, slo, "availability", template, resolved) {
        Ok(expr) => expr,
        Err(message) => return guidance(builder, slo, PanelKind::Gauge, message),
    };
    let budget = 100.0 - slo.objective;
    let mut panel = Panel::new(title(slo), PanelShape::for_kind(PanelKind::Gauge), 8, 8);
    panel.push_target(expr, "availability");
    panel.unit = Some("percent".to_string());
    panel.decimals = Some(3);
    panel.min = Some((slo.objective - budget * 10.0).max(0.0).floor());
    panel.max = Some(100.0);
    panel.thresholds = availability_thresholds(slo.objective);
    panel.description = Some(describe(slo));
    panel
}

fn latency(
    builder: &mut PanelBuilder<'_>,
    slo: &SloSpec,
    template: &ResolvedTemplate,
    resolved: &ResolvedSet,
) -> Panel {
    let expr = match query(builder, slo, "latency", template, resolved) {
        Ok(expr) => expr,
        Err(message) => return guidance(builder, slo, PanelKind::Timeseries, message),
    };
    let mut panel = Panel::new(title(slo), PanelShape::for_kind(PanelKind::Timeseries), 8, 8);
    if expr.contains("{quantile}") {
        for (quantile, legend) in LATENCY_QUANTILES {
            panel.push_target(expr.replace("{quantile}", quantile), *legend);
        }
    } else {
        panel.push_target(expr, title(slo));
    }
    panel.unit = Some("ms".to_string());
    if let Some(limit) = slo.indicator.threshold_ms {
        panel.thresholds = vec![ThresholdStep::base("green"), ThresholdStep::at("red", limit)];
    }
    panel.description = Some(describe(slo));
    panel
}

fn error_rate(
    builder: &mut PanelBuilder<'_>,
    slo: &SloSpec,
    template: &ResolvedTemplate,
    resolved: &ResolvedSet,
) -> Panel {
    let expr = match query(builder, slo, "error_rate", template, resolved) {
        Ok(expr) => expr,
        Err(message) => return guidance(builder, slo, PanelKind::Timeseries, message),
    };
    let mut panel = Panel::new(title(slo), PanelShape::for_kind(PanelKind::Timeseries), 8, 8);
    panel.push_target(expr, "error %");
    panel.unit = Some("percent".to_string());
    panel.thresholds = error_rate_thresholds(slo.objective);
    panel.description = Some(describe(slo));
    panel
}

fn custom(builder: &mut PanelBuilder<'_>, slo: &SloSpec, kind: &str) -> Panel {
    match &slo.indicator.query {
        Some(query) => {
            let mut panel = Panel::new(title(slo), PanelShape::for_kind(PanelKind::Stat), 8, 8);
            panel.push_target(query.clone(), kind);
            panel.description = Some(describe(slo));
            panel
        }
        None => {
            builder.warn(
                WarningKind::Configuration,
                format!("SLO '{}' has unrecognized type '{}' and no query", title(slo), kind),
            );
            let mut panel = Panel::guidance(
                title(slo),
                PanelKind::Stat,
                8,
                8,
                format!("SLO type '{}' is not built in. Set indicator.query to chart it.", kind),
            );
            panel.description = Some(describe(slo));
            panel
        }
    }
}
