//! One row per declared dependency technology.
//!
//! # Design Decisions
//! - Rows follow declaration order; repeated technologies share one row
//! - Unknown technologies are skipped with a configuration warning
//! - Overview mode keeps only panels flagged for the overview; full mode keeps
//!   everything and collapses the rows

use std::sync::Arc;

use crate::config::DependencyDetail;
use crate::context::DependencyRef;
use crate::dashboard::builder::PanelBuilder;
use crate::dashboard::model::Row;
use crate::error::WarningKind;
use crate::templates::{LevelFilter, ResolvedTemplate};

struct Group {
    template: Arc<ResolvedTemplate>,
    names: Vec<String>,
}

pub fn dependency_rows(builder: &mut PanelBuilder<'_>, deps: &[&DependencyRef]) -> Vec<Row> {
    let detail = builder.config().dependency_detail;
    let registry = builder.registry();

    let mut groups: Vec<Group> = Vec::new();
    for dep in deps {
        let Some(template) = registry.technology(&dep.technology, LevelFilter::All) else {
            builder.warn(
                WarningKind::Configuration,
                format!("unknown dependency type '{}', skipped", dep.technology),
            );
            continue;
        };
        let group = match groups.iter().position(|g| g.template.name == template.name) {
            Some(i) => &mut groups[i],
            None => {
                groups.push(Group {
                    template,
                    names: Vec::new(),
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };
        if let Some(name) = &dep.name {
            if !group.names.contains(name) {
                group.names.push(name.clone());
            }
        }
    }

    let mut rows = Vec::with_capacity(groups.len());
    for group in groups {
        let template = &group.template;
        let resolved = builder.resolve(template);
        let title = if group.names.is_empty() {
            template.display_name.clone()
        } else {
            format!("{} ({})", template.display_name, group.names.join(", "))
        };
        let mut row = Row::new(title);
        if detail == DependencyDetail::Full {
            row = row.collapsed();
        }
        for panel in &template.panels {
            if detail == DependencyDetail::Overview && !panel.overview {
                continue;
            }
            if let Some(built) = builder.from_template(panel, &resolved, &template.name) {
                row.panels.push(built);
            }
        }
        if row.panels.is_empty() {
            builder.warn(
                WarningKind::PanelConversion,
                format!("dependency '{}' produced no panels", template.name),
            );
            continue;
        }
        rows.push(row);
    }
    rows
}
