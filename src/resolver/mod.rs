//! Metric name resolution.
//!
//! # Data Flow
//! ```text
//! MetricIntent
//!     → explicit override? (Observability resource)      → Override
//!     → discovery snapshot present and non-empty?
//!         technology group: exact → prefix → leaf tokens
//!         whole snapshot: exact candidate                 → Discovered
//!     → first naming candidate                            → Fallback
//!     → no candidates                                     → Unresolved
//! ```
//!
//! # Design Decisions
//! - Pure function of (intent, overrides, snapshot); never touches the registry
//! - Fallback names are unconfirmed; the validator drops panels whose
//!   fallback metrics the snapshot does not have
//! - Loose matches need the leaf as whole `_` tokens and a compatible type
//! - Histogram intents match `<base>_bucket` series and resolve to `<base>`

pub mod resolved;

use std::collections::BTreeMap;

use crate::discovery::types::{DiscoveryResult, MetricType};
use crate::templates::intent::{InstrumentType, MetricIntent};

pub use resolved::{ResolutionKind, ResolvedMetric, ResolvedSet};

const BUCKET_SUFFIX: &str = "_bucket";

/// Resolves intents for one build.
#[derive(Debug, Clone, Copy)]
pub struct MetricResolver<'a> {
    overrides: &'a BTreeMap<String, String>,
    discovery: Option<&'a DiscoveryResult>,
}

impl<'a> MetricResolver<'a> {
    /// `discovery` is ignored when empty: an empty snapshot confirms nothing.
    pub fn new(overrides: &'a BTreeMap<String, String>, discovery: Option<&'a DiscoveryResult>) -> Self {
        Self {
            overrides,
            discovery: discovery.filter(|d| !d.is_empty()),
        }
    }

    pub fn has_discovery(&self) -> bool {
        self.discovery.is_some()
    }

    pub fn resolve(&self, intent: &MetricIntent) -> ResolvedMetric {
        if let Some(name) = self.overrides.get(&intent.name) {
            return ResolvedMetric::new(&intent.name, Some(name.clone()), ResolutionKind::Override);
        }

        if let Some(name) = self.discovery.and_then(|snapshot| search(intent, snapshot)) {
            return ResolvedMetric::new(&intent.name, Some(name), ResolutionKind::Discovered);
        }

        match intent.fallback_name() {
            Some(name) => {
                ResolvedMetric::new(&intent.name, Some(name.to_string()), ResolutionKind::Fallback)
            }
            None => ResolvedMetric::unresolved(&intent.name),
        }
    }

    pub fn resolve_all(&self, intents: &[MetricIntent]) -> ResolvedSet {
        intents.iter().map(|intent| self.resolve(intent)).collect()
    }
}

/// Name as compared against candidates, or `None` if it cannot match.
fn comparable<'n>(intent: &MetricIntent, name: &'n str) -> Option<&'n str> {
    if intent.instrument == InstrumentType::Histogram {
        name.strip_suffix(BUCKET_SUFFIX)
    } else {
        Some(name)
    }
}

/// Whether `name` holds the `_` tokens of `leaf` as one contiguous run.
fn has_token_run(name: &str, leaf: &str) -> bool {
    let tokens: Vec<&str> = name.split('_').collect();
    let wanted: Vec<&str> = leaf.split('_').collect();
    tokens.windows(wanted.len()).any(|w| w == wanted.as_slice())
}

/// Whether a discovered metric of type `found` can stand in for `expected`.
fn compatible(expected: InstrumentType, found: MetricType) -> bool {
    match (expected, found) {
        (_, MetricType::Unknown) => true,
        (InstrumentType::Counter, MetricType::Counter) => true,
        (InstrumentType::Gauge | InstrumentType::UpDownCounter, MetricType::Gauge) => true,
        (InstrumentType::Histogram, MetricType::Histogram) => true,
        (InstrumentType::Summary, MetricType::Summary) => true,
        _ => false,
    }
}

/// Most `_` tokens shared with any candidate.
fn candidate_overlap(intent: &MetricIntent, name: &str) -> usize {
    intent
        .candidates
        .iter()
        .map(|c| {
            let tokens: Vec<&str> = c.split('_').collect();
            name.split('_').filter(|t| tokens.contains(t)).count()
        })
        .max()
        .unwrap_or(0)
}

fn search(intent: &MetricIntent, snapshot: &DiscoveryResult) -> Option<String> {
    // (discovered name, name as compared)
    let group: Vec<(&str, &str)> = snapshot
        .names_for(intent.technology())
        .iter()
        .filter_map(|n| comparable(intent, n).map(|c| (n.as_str(), c)))
        .collect();

    let exact = intent
        .candidates
        .iter()
        .find(|c| group.iter().any(|(_, n)| *n == c.as_str()))
        .map(String::as_str);

    let prefixed = || {
        intent.candidates.iter().find_map(|c| {
            group
                .iter()
                .find(|(_, n)| n.starts_with(c.as_str()))
                .map(|(_, n)| *n)
        })
    };

    // Closest to a candidate wins, then the shortest, then name order.
    let leaf = intent.leaf();
    let loose = || {
        group
            .iter()
            .filter(|(_, n)| has_token_run(n, leaf))
            .filter(|(raw, _)| {
                snapshot
                    .get(raw)
                    .map_or(true, |m| compatible(intent.instrument, m.metric_type))
            })
            .map(|(_, n)| *n)
            .max_by(|a, b| {
                candidate_overlap(intent, a)
                    .cmp(&candidate_overlap(intent, b))
                    .then_with(|| b.len().cmp(&a.len()))
                    .then_with(|| b.cmp(a))
            })
    };

    let anywhere = || {
        intent.candidates.iter().map(String::as_str).find(|c| {
            snapshot
                .names()
                .filter_map(|n| comparable(intent, n))
                .any(|n| n == *c)
        })
    };

    exact
        .or_else(prefixed)
        .or_else(loose)
        .or_else(anywhere)
        .map(str::to_string)
}
