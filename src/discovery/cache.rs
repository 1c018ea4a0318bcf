//! Per-selector discovery cache shared by batch builds.

use std::sync::Arc;

use dashmap::DashMap;

use crate::discovery::client::DiscoveryClient;
use crate::discovery::types::DiscoveryResult;

/// A discovery snapshot plus the reason it is empty, if discovery failed.
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    pub snapshot: Arc<DiscoveryResult>,
    pub unavailable: Option<String>,
}

impl DiscoveryOutcome {
    pub fn available(snapshot: DiscoveryResult) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            unavailable: None,
        }
    }

    /// Discovery disabled: nothing to validate against, nothing to warn about.
    pub fn skipped() -> Self {
        Self {
            snapshot: Arc::new(DiscoveryResult::empty()),
            unavailable: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            snapshot: Arc::new(DiscoveryResult::empty()),
            unavailable: Some(reason.into()),
        }
    }
}

/// Selector → outcome. Entries are written once and never invalidated, so a
/// batch sees one consistent snapshot per service.
#[derive(Clone, Default)]
pub struct DiscoveryCache {
    inner: Arc<DashMap<String, DiscoveryOutcome>>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, selector: &str) -> Option<DiscoveryOutcome> {
        self.inner.get(selector).map(|entry| entry.value().clone())
    }

    /// Store `outcome` unless another task got there first; returns the
    /// entry that ended up cached.
    pub fn insert(&self, selector: &str, outcome: DiscoveryOutcome) -> DiscoveryOutcome {
        self.inner
            .entry(selector.to_string())
            .or_insert(outcome)
            .value()
            .clone()
    }

    /// Cached outcome for `service`, discovering on first use.
    pub async fn get_or_discover(&self, client: &DiscoveryClient, service: &str) -> DiscoveryOutcome {
        let selector = client.selector_for(service);
        if let Some(hit) = self.get(&selector) {
            tracing::debug!(selector = %selector, "Discovery cache hit");
            return hit;
        }
        let outcome = match client.try_discover(service).await {
            Ok(snapshot) => DiscoveryOutcome::available(snapshot),
            Err(e) => DiscoveryOutcome::unavailable(e.to_string()),
        };
        self.insert(&selector, outcome)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
