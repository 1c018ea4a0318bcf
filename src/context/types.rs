//! Input model: the service description handed to a build.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, BuildResult};

/// Identity and classification of the service a dashboard is built for.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServiceContext {
    /// Service name; substituted for every `$service` placeholder.
    pub name: String,
    pub team: String,
    pub tier: String,
    /// Service type name or alias (e.g. "api", "worker").
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl ServiceContext {
    pub fn new(
        name: impl Into<String>,
        team: impl Into<String>,
        tier: impl Into<String>,
        service_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            team: team.into(),
            tier: tier.into(),
            service_type: service_type.into(),
            environment: None,
        }
    }

    /// Check the only hard precondition of a build: a usable service name.
    ///
    /// The name ends up inside query label matchers, so quotes, braces and the
    /// placeholder sigil are rejected.
    pub fn validate(&self) -> BuildResult<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(BuildError::InvalidService("service name is empty".into()));
        }
        if name.len() != self.name.len() {
            return Err(BuildError::InvalidService(format!(
                "service name '{}' has surrounding whitespace",
                self.name
            )));
        }
        if name.len() > 128 {
            return Err(BuildError::InvalidService(format!(
                "service name exceeds 128 characters ({})",
                name.len()
            )));
        }
        let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
        let chars_ok = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !starts_ok || !chars_ok {
            return Err(BuildError::InvalidService(format!(
                "service name '{}' must be alphanumeric with '-', '_' or '.'",
                name
            )));
        }
        Ok(())
    }
}

/// A declared resource attached to a service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawResource", into = "RawResource")]
pub enum Resource {
    Slo(SloSpec),
    Dependencies(DependenciesSpec),
    Observability(ObservabilitySpec),
    /// Resource kinds owned by other collaborators (alerting, paging, ...).
    Other(String),
}

/// Wire shape shared by every resource kind.
#[derive(Deserialize, Serialize)]
struct RawResource {
    kind: String,
    #[serde(default)]
    spec: serde_json::Value,
}

impl TryFrom<RawResource> for Resource {
    type Error = serde_json::Error;

    fn try_from(raw: RawResource) -> Result<Self, Self::Error> {
        Ok(match raw.kind.as_str() {
            "SLO" => Resource::Slo(serde_json::from_value(raw.spec)?),
            "Dependencies" => Resource::Dependencies(serde_json::from_value(raw.spec)?),
            "Observability" => Resource::Observability(serde_json::from_value(raw.spec)?),
            _ => Resource::Other(raw.kind),
        })
    }
}

impl From<Resource> for RawResource {
    fn from(resource: Resource) -> Self {
        let (kind, spec) = match resource {
            Resource::Slo(spec) => ("SLO".to_string(), serde_json::to_value(spec)),
            Resource::Dependencies(spec) => ("Dependencies".to_string(), serde_json::to_value(spec)),
            Resource::Observability(spec) => ("Observability".to_string(), serde_json::to_value(spec)),
            Resource::Other(kind) => (kind, Ok(serde_json::Value::Null)),
        };
        Self {
            kind,
            spec: spec.unwrap_or_default(),
        }
    }
}

/// A service level objective.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SloSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Target percentage, e.g. 99.9.
    pub objective: f64,
    #[serde(default = "default_window")]
    pub window: String,
    pub indicator: IndicatorSpec,
}

fn default_window() -> String {
    "30d".to_string()
}

impl SloSpec {
    pub fn new(kind: impl Into<String>, objective: f64) -> Self {
        Self {
            name: None,
            objective,
            window: default_window(),
            indicator: IndicatorSpec {
                kind: kind.into(),
                query: None,
                threshold_ms: None,
            },
        }
    }

    /// Semantic kind of the indicator.
    pub fn kind(&self) -> SloKind {
        SloKind::parse(&self.indicator.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndicatorSpec {
    #[serde(rename = "type")]
    pub kind: String,
    /// User-supplied query that replaces the template formula.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Latency objective threshold in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_ms: Option<f64>,
}

/// Semantic SLO indicator types that get a dedicated panel shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SloKind {
    Availability,
    Latency,
    ErrorRate,
    Other(String),
}

impl SloKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "availability" | "success-rate" => SloKind::Availability,
            "latency" => SloKind::Latency,
            "error-rate" | "errors" => SloKind::ErrorRate,
            other => SloKind::Other(other.to_string()),
        }
    }
}

/// Declared infrastructure dependencies, grouped the way service specs list them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DependenciesSpec {
    pub databases: Vec<DependencyRef>,
    pub caches: Vec<DependencyRef>,
    pub queues: Vec<DependencyRef>,
    pub orchestration: Vec<DependencyRef>,
}

impl DependenciesSpec {
    /// All dependency entries in declaration order: databases, caches, queues,
    /// orchestration.
    pub fn iter(&self) -> impl Iterator<Item = &DependencyRef> {
        self.databases
            .iter()
            .chain(self.caches.iter())
            .chain(self.queues.iter())
            .chain(self.orchestration.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DependencyRef {
    /// Technology name or alias (e.g. "postgresql", "redis").
    #[serde(rename = "type")]
    pub technology: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DependencyRef {
    pub fn new(technology: impl Into<String>) -> Self {
        Self {
            technology: technology.into(),
            name: None,
        }
    }
}

/// Per-service metric name overrides (intent id → concrete metric name).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilitySpec {
    pub metric_overrides: BTreeMap<String, String>,
}

/// A complete build input as read from disk.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServiceInput {
    pub service: ServiceContext,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// Every SLO resource, in declaration order.
pub fn slos(resources: &[Resource]) -> Vec<&SloSpec> {
    resources
        .iter()
        .filter_map(|r| match r {
            Resource::Slo(slo) => Some(slo),
            _ => None,
        })
        .collect()
}

/// Every declared dependency across all `Dependencies` resources.
pub fn dependencies(resources: &[Resource]) -> Vec<&DependencyRef> {
    resources
        .iter()
        .filter_map(|r| match r {
            Resource::Dependencies(deps) => Some(deps),
            _ => None,
        })
        .flat_map(|deps| deps.iter())
        .collect()
}

/// Merged metric overrides; later resources win on conflicts.
pub fn metric_overrides(resources: &[Resource]) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for resource in resources {
        if let Resource::Observability(spec) = resource {
            for (intent, name) in &spec.metric_overrides {
                merged.insert(intent.clone(), name.clone());
            }
        }
    }
    merged
}
