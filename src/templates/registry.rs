//! Template catalog with alias lookup and single-parent inheritance.
//!
//! # Responsibilities
//! - Map type names and aliases to catalog entries
//! - Flatten `extends` chains into a `ResolvedTemplate`
//! - Memoize resolutions for concurrent readers
//!
//! # Design Decisions
//! - Alias lookup happens before `extends` resolution
//! - The parent is always resolved at `LevelFilter::All`
//! - Child entries shadow parent entries with the same key; order is otherwise kept
//! - Catalog entries never change after construction

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::templates::catalog;
use crate::templates::intent::{LevelFilter, MetricIntent};
use crate::templates::template::{ResolvedTemplate, Template, TemplateKind};

static GLOBAL: OnceLock<TemplateRegistry> = OnceLock::new();

/// Read-only catalog of service-type and technology templates.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
    /// Normalized alias (and canonical name) → canonical name.
    aliases: HashMap<String, String>,
    memo: DashMap<(String, LevelFilter), Arc<ResolvedTemplate>>,
}

impl TemplateRegistry {
    /// Build a registry from catalog entries. Later entries replace earlier ones
    /// with the same name.
    pub fn new(templates: Vec<Template>) -> Self {
        let mut registry = Self::default();
        for template in templates {
            let canonical = normalize(&template.name);
            for alias in &template.aliases {
                registry.aliases.insert(normalize(alias), canonical.clone());
            }
            registry.aliases.insert(canonical.clone(), canonical.clone());
            registry.templates.insert(canonical, template);
        }
        registry
    }

    /// The built-in catalog.
    pub fn builtin() -> Self {
        Self::new(catalog::builtin_templates())
    }

    /// Process-wide built-in registry, built on first use.
    pub fn global() -> &'static TemplateRegistry {
        GLOBAL.get_or_init(TemplateRegistry::builtin)
    }

    /// Look up a template by name or alias (case-insensitive, `_` == `-`).
    pub fn lookup(&self, name: &str) -> Option<&Template> {
        let canonical = self.aliases.get(&normalize(name))?;
        self.templates.get(canonical)
    }

    /// Resolve a service-type template by name or alias.
    pub fn service_type(&self, name: &str, level: LevelFilter) -> Option<Arc<ResolvedTemplate>> {
        self.lookup_kind(name, TemplateKind::ServiceType)
            .map(|t| self.resolve(t, level))
    }

    /// Resolve a dependency-technology template by name or alias.
    pub fn technology(&self, name: &str, level: LevelFilter) -> Option<Arc<ResolvedTemplate>> {
        self.lookup_kind(name, TemplateKind::Technology)
            .map(|t| self.resolve(t, level))
    }

    fn lookup_kind(&self, name: &str, kind: TemplateKind) -> Option<&Template> {
        self.lookup(name).filter(|t| t.kind == kind)
    }

    /// Canonical names of every template of `kind`, sorted.
    pub fn names(&self, kind: TemplateKind) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .templates
            .values()
            .filter(|t| t.kind == kind)
            .map(|t| t.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Flatten a template's inheritance chain, memoized per (template, level).
    pub fn resolve(&self, template: &Template, level: LevelFilter) -> Arc<ResolvedTemplate> {
        let key = (normalize(&template.name), level);
        if let Some(hit) = self.memo.get(&key) {
            return hit.value().clone();
        }
        let mut visiting = HashSet::new();
        let resolved = Arc::new(self.resolve_chain(template, level, &mut visiting));
        self.memo.entry(key).or_insert(resolved).value().clone()
    }

    /// Intents only, in resolution order.
    pub fn resolve_intents(&self, template: &Template, level: LevelFilter) -> Vec<MetricIntent> {
        self.resolve(template, level).intents.clone()
    }

    fn resolve_chain(
        &self,
        template: &Template,
        level: LevelFilter,
        visiting: &mut HashSet<String>,
    ) -> ResolvedTemplate {
        visiting.insert(normalize(&template.name));

        let mut intents = Vec::new();
        let mut formulas = Vec::new();
        let mut panels = Vec::new();

        if let Some(parent_name) = &template.extends {
            match self.lookup(parent_name) {
                Some(parent) if visiting.contains(&normalize(&parent.name)) => {
                    tracing::warn!(
                        template = %template.name,
                        parent = %parent_name,
                        "Template extends cycle, ignoring parent"
                    );
                }
                Some(parent) => {
                    let inherited = self.resolve_chain(parent, LevelFilter::All, visiting);
                    intents = inherited.intents;
                    formulas = inherited.slo_formulas;
                    panels = inherited.panels;
                }
                None => {
                    tracing::warn!(
                        template = %template.name,
                        parent = %parent_name,
                        "Unknown parent template, resolving as root"
                    );
                }
            }
        }

        intents.extend(
            template
                .intents
                .iter()
                .filter(|i| level.includes(i.level))
                .cloned(),
        );
        formulas.extend(template.slo_formulas.iter().cloned());
        panels.extend(template.panels.iter().cloned());

        ResolvedTemplate {
            name: template.name.clone(),
            display_name: template.display_name.clone(),
            kind: template.kind,
            intents: dedup_keep_last(intents, |i| i.name.as_str()),
            slo_formulas: dedup_keep_last(formulas, |f| f.name.as_str()),
            panels: dedup_keep_last(panels, |p| p.title.as_str()),
        }
    }
}

/// Drop earlier duplicates so the last definition of each key wins, keeping the
/// relative order of the survivors.
pub fn dedup_keep_last<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut seen = HashSet::new();
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items.into_iter().rev() {
        if seen.insert(key(&item).to_string()) {
            kept.push(item);
        }
    }
    kept.reverse();
    kept
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('_', "-")
}
