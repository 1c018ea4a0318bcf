//! Discovery data types.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Backend-reported (or inferred) metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Unknown,
}

impl MetricType {
    /// Parse the Prometheus metadata `type` string. Anything unrecognised
    /// (`untyped`, `info`, `stateset`, ...) is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "counter" => MetricType::Counter,
            "gauge" => MetricType::Gauge,
            "histogram" | "gaugehistogram" => MetricType::Histogram,
            "summary" => MetricType::Summary,
            _ => MetricType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
            MetricType::Unknown => "unknown",
        }
    }
}

/// A metric observed in the backend for one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredMetric {
    pub name: String,
    pub metric_type: MetricType,
    pub technology: String,
    pub help: Option<String>,
    /// Label name → observed values.
    pub labels: BTreeMap<String, BTreeSet<String>>,
}

impl DiscoveredMetric {
    /// An unclassified metric with no metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric_type: MetricType::Unknown,
            technology: String::new(),
            help: None,
            labels: BTreeMap::new(),
        }
    }
}

/// Immutable discovery snapshot for one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiscoveryResult {
    pub total: usize,
    /// Sorted by name, unique.
    pub metrics: Vec<DiscoveredMetric>,
    /// Technology → metric names (sorted).
    pub by_technology: BTreeMap<String, Vec<String>>,
    /// Type → metric names (sorted).
    pub by_type: BTreeMap<MetricType, Vec<String>>,
}

impl DiscoveryResult {
    /// Build the snapshot and its groupings. Later duplicates of a name are
    /// merged into the first occurrence's label sets.
    pub fn new(metrics: Vec<DiscoveredMetric>) -> Self {
        let mut unique: BTreeMap<String, DiscoveredMetric> = BTreeMap::new();
        for metric in metrics {
            match unique.get_mut(&metric.name) {
                Some(existing) => {
                    for (label, values) in metric.labels {
                        existing.labels.entry(label).or_default().extend(values);
                    }
                }
                None => {
                    unique.insert(metric.name.clone(), metric);
                }
            }
        }
        let metrics: Vec<DiscoveredMetric> = unique.into_values().collect();

        let mut by_technology: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut by_type: BTreeMap<MetricType, Vec<String>> = BTreeMap::new();
        for m in &metrics {
            by_technology
                .entry(m.technology.clone())
                .or_default()
                .push(m.name.clone());
            by_type.entry(m.metric_type).or_default().push(m.name.clone());
        }

        Self {
            total: metrics.len(),
            metrics,
            by_technology,
            by_type,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics
            .binary_search_by(|m| m.name.as_str().cmp(name))
            .is_ok()
    }

    pub fn get(&self, name: &str) -> Option<&DiscoveredMetric> {
        self.metrics
            .binary_search_by(|m| m.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.metrics[i])
    }

    /// Metric names classified under `technology` (sorted).
    pub fn names_for(&self, technology: &str) -> &[String] {
        self.by_technology
            .get(technology)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|m| m.name.as_str())
    }
}
