//! Metric intents: backend-agnostic metric requirements declared by templates.

use serde::Serialize;

/// Instrument kind an intent expects the backend metric to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstrumentType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    UpDownCounter,
}

/// How strongly a template asks for an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementLevel {
    Required,
    Recommended,
}

/// Which intents a template resolution should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelFilter {
    Required,
    Recommended,
    All,
}

impl LevelFilter {
    pub fn includes(self, level: RequirementLevel) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::Required => level == RequirementLevel::Required,
            LevelFilter::Recommended => level == RequirementLevel::Recommended,
        }
    }
}

/// A label the metric is expected to carry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub required: bool,
    pub examples: Vec<String>,
}

/// An abstract metric requirement. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricIntent {
    /// Dotted semantic id, e.g. `postgresql.connections`.
    pub name: String,
    pub instrument: InstrumentType,
    pub unit: String,
    pub attributes: Vec<Attribute>,
    pub level: RequirementLevel,
    /// SLO formulas or health panels this intent feeds.
    pub slo_usage: Vec<String>,
    pub buckets: Option<Vec<f64>>,
    /// Conventional concrete names, most common first.
    pub candidates: Vec<String>,
    technology: Option<String>,
}

impl MetricIntent {
    pub fn new(name: impl Into<String>, instrument: InstrumentType, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instrument,
            unit: unit.into(),
            attributes: Vec::new(),
            level: RequirementLevel::Required,
            slo_usage: Vec::new(),
            buckets: None,
            candidates: Vec::new(),
            technology: None,
        }
    }

    pub fn counter(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self::new(name, InstrumentType::Counter, unit)
    }

    pub fn gauge(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self::new(name, InstrumentType::Gauge, unit)
    }

    pub fn histogram(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self::new(name, InstrumentType::Histogram, unit)
    }

    pub fn recommended(mut self) -> Self {
        self.level = RequirementLevel::Recommended;
        self
    }

    pub fn candidates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn attribute(mut self, name: &str, required: bool, examples: &[&str]) -> Self {
        self.attributes.push(Attribute {
            name: name.to_string(),
            required,
            examples: examples.iter().map(|e| e.to_string()).collect(),
        });
        self
    }

    pub fn used_by(mut self, usage: &str) -> Self {
        self.slo_usage.push(usage.to_string());
        self
    }

    pub fn buckets(mut self, bounds: &[f64]) -> Self {
        self.buckets = Some(bounds.to_vec());
        self
    }

    /// Pin the technology group instead of deriving it from the id prefix.
    pub fn technology_group(mut self, technology: impl Into<String>) -> Self {
        self.technology = Some(technology.into());
        self
    }

    /// Technology group discovered metrics are searched in.
    pub fn technology(&self) -> &str {
        match &self.technology {
            Some(t) => t,
            None => self.name.split('.').next().unwrap_or(&self.name),
        }
    }

    /// Last dotted segment, used for loose substring matching.
    pub fn leaf(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Conventional name assumed when nothing better is known.
    pub fn fallback_name(&self) -> Option<&str> {
        self.candidates.first().map(String::as_str)
    }
}
