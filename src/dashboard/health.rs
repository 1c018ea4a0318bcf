//! The "Service Health" row: the service type's own panels.

use crate::dashboard::builder::PanelBuilder;
use crate::dashboard::model::Row;
use crate::resolver::ResolvedSet;
use crate::templates::ResolvedTemplate;

pub const HEALTH_ROW: &str = "Service Health";

/// Health row for `template`, or `None` when the type declares no panels.
pub fn health_row(
    builder: &mut PanelBuilder<'_>,
    template: &ResolvedTemplate,
    resolved: &ResolvedSet,
) -> Option<Row> {
    let mut row = Row::new(HEALTH_ROW);
    for panel in &template.panels {
        if let Some(built) = builder.from_template(panel, resolved, &template.name) {
            row.panels.push(built);
        }
    }
    (!row.panels.is_empty()).then_some(row)
}
