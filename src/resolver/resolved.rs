//! Resolution results.

use std::collections::BTreeMap;

use serde::Serialize;

/// How an intent got its concrete name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionKind {
    Override,
    Discovered,
    Fallback,
    Unresolved,
}

impl ResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionKind::Override => "override",
            ResolutionKind::Discovered => "discovered",
            ResolutionKind::Fallback => "fallback",
            ResolutionKind::Unresolved => "unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMetric {
    pub intent: String,
    pub concrete: Option<String>,
    pub kind: ResolutionKind,
}

impl ResolvedMetric {
    pub fn new(intent: &str, concrete: Option<String>, kind: ResolutionKind) -> Self {
        Self {
            intent: intent.to_string(),
            concrete,
            kind,
        }
    }

    pub fn unresolved(intent: &str) -> Self {
        Self::new(intent, None, ResolutionKind::Unresolved)
    }

    pub fn is_resolved(&self) -> bool {
        self.concrete.is_some()
    }
}

/// Resolutions for one template, keyed by intent id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedSet {
    entries: BTreeMap<String, ResolvedMetric>,
}

impl ResolvedSet {
    pub fn get(&self, intent: &str) -> Option<&ResolvedMetric> {
        self.entries.get(intent)
    }

    /// Concrete name for `intent`, if it resolved.
    pub fn concrete(&self, intent: &str) -> Option<&str> {
        self.entries.get(intent)?.concrete.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedMetric> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of entries per kind.
    pub fn tally(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.values() {
            *counts.entry(entry.kind.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<ResolvedMetric> for ResolvedSet {
    fn from_iter<I: IntoIterator<Item = ResolvedMetric>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|r| (r.intent.clone(), r))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_lookup_and_tally() {
        let set: ResolvedSet = vec![
            ResolvedMetric::new("a", Some("a_total".into()), ResolutionKind::Discovered),
            ResolvedMetric::new("b", Some("b_total".into()), ResolutionKind::Fallback),
            ResolvedMetric::unresolved("c"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.concrete("a"), Some("a_total"));
        assert_eq!(set.concrete("c"), None);
        assert_eq!(set.concrete("zzz"), None);
        assert_eq!(set.tally()["unresolved"], 1);
        assert_eq!(set.len(), 3);
    }
}
