//! Template definitions for service types and dependency technologies.
//!
//! Query text uses two kinds of placeholders:
//! - `{{intent.id}}` is replaced by the resolved concrete metric name
//! - `$service` stays unbound until the dashboard's final substitution pass

use serde::Serialize;

use crate::templates::intent::MetricIntent;

/// Panel shape requested by a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    Timeseries,
    Gauge,
    Stat,
    Table,
}

/// One threshold step: color from `value` upward (`None` = base step).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdStep {
    pub color: String,
    pub value: Option<f64>,
}

impl ThresholdStep {
    pub fn base(color: &str) -> Self {
        Self {
            color: color.to_string(),
            value: None,
        }
    }

    pub fn at(color: &str, value: f64) -> Self {
        Self {
            color: color.to_string(),
            value: Some(value),
        }
    }
}

/// A query with intent placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTemplate {
    pub expr: String,
    pub legend: String,
}

impl QueryTemplate {
    pub fn new(expr: impl Into<String>, legend: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            legend: legend.into(),
        }
    }

    /// Intent ids referenced by `{{...}}` placeholders, in order of first use.
    pub fn intent_refs(&self) -> Vec<&str> {
        intent_refs(&self.expr)
    }
}

/// Extract `{{intent.id}}` placeholder names from query text.
pub fn intent_refs(expr: &str) -> Vec<&str> {
    let mut refs: Vec<&str> = Vec::new();
    let mut rest = expr;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let name = after[..end].trim();
        if !name.is_empty() && !refs.contains(&name) {
            refs.push(name);
        }
        rest = &after[end + 2..];
    }
    refs
}

/// Replace `{{intent.id}}` placeholders using `lookup`.
pub fn bind_intents<'a>(expr: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut rest = expr;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match lookup(name) {
                    Some(concrete) => out.push_str(concrete),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// A panel declared by a template.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelTemplate {
    pub title: String,
    pub kind: PanelKind,
    pub queries: Vec<QueryTemplate>,
    pub unit: Option<String>,
    pub decimals: Option<u8>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub thresholds: Vec<ThresholdStep>,
    pub width: u32,
    pub height: u32,
    /// Included in overview mode (full mode includes every panel).
    pub overview: bool,
    /// Setup hint shown when the panel's metrics cannot be resolved.
    pub guidance: Option<String>,
    pub description: Option<String>,
}

impl PanelTemplate {
    pub fn new(kind: PanelKind, title: impl Into<String>) -> Self {
        let width = match kind {
            PanelKind::Timeseries | PanelKind::Table => 12,
            PanelKind::Gauge | PanelKind::Stat => 6,
        };
        Self {
            title: title.into(),
            kind,
            queries: Vec::new(),
            unit: None,
            decimals: None,
            min: None,
            max: None,
            thresholds: Vec::new(),
            width,
            height: 8,
            overview: false,
            guidance: None,
            description: None,
        }
    }

    pub fn timeseries(title: impl Into<String>) -> Self {
        Self::new(PanelKind::Timeseries, title)
    }

    pub fn gauge(title: impl Into<String>) -> Self {
        Self::new(PanelKind::Gauge, title)
    }

    pub fn stat(title: impl Into<String>) -> Self {
        Self::new(PanelKind::Stat, title)
    }

    pub fn table(title: impl Into<String>) -> Self {
        Self::new(PanelKind::Table, title)
    }

    pub fn query(mut self, expr: impl Into<String>, legend: impl Into<String>) -> Self {
        self.queries.push(QueryTemplate::new(expr, legend));
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn decimals(mut self, decimals: u8) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn thresholds(mut self, steps: Vec<ThresholdStep>) -> Self {
        self.thresholds = steps;
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn overview(mut self) -> Self {
        self.overview = true;
        self
    }

    pub fn guidance(mut self, message: &str) -> Self {
        self.guidance = Some(message.to_string());
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// A named SLO formula. `expr` contains `$service` and may contain intent
/// placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct SloFormula {
    pub name: String,
    pub expr: String,
}

impl SloFormula {
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expr: expr.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    ServiceType,
    Technology,
}

/// A catalog entry. `extends` names at most one parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub display_name: String,
    pub kind: TemplateKind,
    pub extends: Option<String>,
    pub aliases: Vec<String>,
    pub intents: Vec<MetricIntent>,
    pub slo_formulas: Vec<SloFormula>,
    pub panels: Vec<PanelTemplate>,
}

impl Template {
    pub fn new(kind: TemplateKind, name: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            kind,
            extends: None,
            aliases: Vec::new(),
            intents: Vec::new(),
            slo_formulas: Vec::new(),
            panels: Vec::new(),
        }
    }

    pub fn service_type(name: &str, display_name: &str) -> Self {
        Self::new(TemplateKind::ServiceType, name, display_name)
    }

    pub fn technology(name: &str, display_name: &str) -> Self {
        Self::new(TemplateKind::Technology, name, display_name)
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.extends = Some(parent.to_string());
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn intent(mut self, intent: MetricIntent) -> Self {
        self.intents.push(intent);
        self
    }

    pub fn formula(mut self, name: &str, expr: &str) -> Self {
        self.slo_formulas.push(SloFormula::new(name, expr));
        self
    }

    pub fn panel(mut self, panel: PanelTemplate) -> Self {
        self.panels.push(panel);
        self
    }
}

/// A template with its inheritance chain flattened.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTemplate {
    pub name: String,
    pub display_name: String,
    pub kind: TemplateKind,
    pub intents: Vec<MetricIntent>,
    pub slo_formulas: Vec<SloFormula>,
    pub panels: Vec<PanelTemplate>,
}

impl ResolvedTemplate {
    pub fn intent(&self, name: &str) -> Option<&MetricIntent> {
        self.intents.iter().find(|i| i.name == name)
    }

    pub fn formula(&self, name: &str) -> Option<&SloFormula> {
        self.slo_formulas.iter().find(|f| f.name == name)
    }
}
