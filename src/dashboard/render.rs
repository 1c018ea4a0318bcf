//! Render a laid-out `Dashboard` to the dashboarding system's JSON model.
//!
//! # Design Decisions
//! - Rows and leaf panels are interleaved siblings in the top-level `panels`
//!   array; collapsed rows carry their panels nested instead
//! - Shape options come from one exhaustive match on `PanelShape`
//! - `serde_json` maps are ordered, so equal dashboards render byte-identical

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::dashboard::model::{Dashboard, GridPos, Panel, PanelShape, Row, Target};
use crate::templates::ThresholdStep;

const DATASOURCE_VARIABLE: &str = "${datasource}";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTarget<'a> {
    expr: &'a str,
    legend_format: &'a str,
    ref_id: &'a str,
    datasource: Value,
}

impl<'a> From<&'a Target> for WireTarget<'a> {
    fn from(target: &'a Target) -> Self {
        Self {
            expr: &target.expr,
            legend_format: &target.legend,
            ref_id: &target.ref_id,
            datasource: datasource(),
        }
    }
}

#[derive(Serialize)]
struct WireGridPos {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl From<GridPos> for WireGridPos {
    fn from(grid: GridPos) -> Self {
        Self {
            x: grid.x,
            y: grid.y,
            w: grid.w,
            h: grid.h,
        }
    }
}

fn datasource() -> Value {
    json!({ "type": "prometheus", "uid": DATASOURCE_VARIABLE })
}

/// Full dashboard document.
pub fn render(dashboard: &Dashboard) -> Value {
    let mut panels = Vec::with_capacity(dashboard.panel_count() + dashboard.rows.len());
    for row in &dashboard.rows {
        panels.extend(render_row(row));
    }
    panels.extend(dashboard.panels.iter().map(render_panel));

    let variables: Vec<Value> = dashboard
        .variables
        .iter()
        .map(|v| {
            json!({
                "name": v.name,
                "label": v.label,
                "type": "datasource",
                "query": v.query,
                "hide": 0,
                "refresh": 1,
                "current": {},
            })
        })
        .collect();

    json!({
        "id": null,
        "uid": dashboard.uid,
        "title": dashboard.title,
        "tags": dashboard.tags,
        "timezone": dashboard.timezone,
        "editable": dashboard.editable,
        "schemaVersion": dashboard.schema_version,
        "refresh": dashboard.refresh,
        "time": { "from": dashboard.time_from, "to": dashboard.time_to },
        "templating": { "list": variables },
        "panels": panels,
    })
}

/// A row header followed by its panels, or a collapsed row holding them.
fn render_row(row: &Row) -> Vec<Value> {
    let rendered: Vec<Value> = row.panels.iter().map(render_panel).collect();
    let mut header = json!({
        "id": row.id,
        "type": "row",
        "title": row.title,
        "collapsed": row.collapsed,
        "gridPos": WireGridPos::from(GridPos { x: 0, y: row.y, w: 24, h: 1 }),
    });
    if row.collapsed {
        header["panels"] = Value::Array(rendered);
        vec![header]
    } else {
        header["panels"] = Value::Array(Vec::new());
        let mut out = Vec::with_capacity(rendered.len() + 1);
        out.push(header);
        out.extend(rendered);
        out
    }
}

pub fn render_panel(panel: &Panel) -> Value {
    let targets: Vec<WireTarget<'_>> = panel.targets.iter().map(WireTarget::from).collect();
    let mut out = json!({
        "id": panel.id,
        "type": panel_type(&panel.shape),
        "title": panel.title,
        "gridPos": WireGridPos::from(panel.grid),
        "datasource": datasource(),
        "targets": targets,
        "fieldConfig": { "defaults": field_defaults(panel), "overrides": [] },
        "options": options(&panel.shape),
    });
    if let Some(description) = &panel.description {
        out["description"] = json!(description);
    }
    out
}

fn panel_type(shape: &PanelShape) -> &'static str {
    match shape {
        PanelShape::Timeseries { .. } => "timeseries",
        PanelShape::Gauge { .. } => "gauge",
        PanelShape::Stat { .. } => "stat",
        PanelShape::Table { .. } => "table",
    }
}

fn options(shape: &PanelShape) -> Value {
    match shape {
        PanelShape::Timeseries { .. } => json!({
            "legend": { "displayMode": "list", "placement": "bottom", "showLegend": true },
            "tooltip": { "mode": "multi", "sort": "desc" },
        }),
        PanelShape::Gauge {
            show_threshold_markers,
        } => json!({
            "reduceOptions": { "calcs": ["lastNotNull"], "fields": "", "values": false },
            "showThresholdLabels": false,
            "showThresholdMarkers": show_threshold_markers,
            "orientation": "auto",
        }),
        PanelShape::Stat { sparkline } => {
            let graph_mode = if *sparkline { "area" } else { "none" };
            json!({
                "reduceOptions": { "calcs": ["lastNotNull"], "fields": "", "values": false },
                "colorMode": "value",
                "graphMode": graph_mode,
                "justifyMode": "auto",
                "textMode": "auto",
            })
        }
        PanelShape::Table { show_header } => json!({
            "showHeader": show_header,
            "cellHeight": "sm",
        }),
    }
}

fn field_defaults(panel: &Panel) -> Value {
    let mut defaults = Map::new();
    if let Some(unit) = &panel.unit {
        defaults.insert("unit".into(), json!(unit));
    }
    if let Some(decimals) = panel.decimals {
        defaults.insert("decimals".into(), json!(decimals));
    }
    if let Some(min) = panel.min {
        defaults.insert("min".into(), json!(min));
    }
    if let Some(max) = panel.max {
        defaults.insert("max".into(), json!(max));
    }
    if !panel.thresholds.is_empty() {
        defaults.insert("thresholds".into(), thresholds(&panel.thresholds));
        defaults.insert("color".into(), json!({ "mode": "thresholds" }));
    }
    if let Some(message) = &panel.guidance {
        defaults.insert("noValue".into(), json!(message));
    }
    if let PanelShape::Timeseries { fill_opacity } = panel.shape {
        defaults.insert("custom".into(), json!({ "fillOpacity": fill_opacity }));
    }
    Value::Object(defaults)
}

fn thresholds(steps: &[ThresholdStep]) -> Value {
    let steps: Vec<Value> = steps
        .iter()
        .map(|s| json!({ "color": s.color, "value": s.value }))
        .collect();
    json!({ "mode": "absolute", "steps": steps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::context::ServiceContext;
    use crate::dashboard::builder::dashboard_shell;
    use crate::dashboard::layout::GridLayoutEngine;
    use crate::templates::PanelKind;

    fn sample(collapsed: bool) -> Dashboard {
        let mut d = dashboard_shell(
            &ServiceContext::new("svc", "team", "tier-1", "api"),
            &DashboardConfig::default(),
        );
        let mut gauge = Panel::new("Availability", PanelShape::for_kind(PanelKind::Gauge), 8, 8);
        gauge.push_target("avg(up{service=\"svc\"})", "up");
        gauge.unit = Some("percent".into());
        gauge.thresholds = vec![ThresholdStep::base("red"), ThresholdStep::at("green", 99.0)];
        let mut row = Row::new("SLOs");
        row.panels.push(gauge);
        row.panels.push(Panel::guidance("Hint", PanelKind::Stat, 8, 8, "instrument me"));
        if collapsed {
            row = row.collapsed();
        }
        d.rows.push(row);
        GridLayoutEngine::finalize(&mut d);
        d
    }

    #[test]
    fn test_open_row_panels_are_siblings() {
        let json = render(&sample(false));
        let panels = json["panels"].as_array().unwrap();
        assert_eq!(panels.len(), 3);
        assert_eq!(panels[0]["type"], "row");
        assert_eq!(panels[0]["panels"], json!([]));
        assert_eq!(panels[1]["type"], "gauge");
        assert_eq!(panels[1]["targets"][0]["legendFormat"], "up");
        assert_eq!(panels[1]["targets"][0]["refId"], "A");
        assert_eq!(panels[1]["gridPos"]["y"], 1);
        assert_eq!(panels[1]["fieldConfig"]["defaults"]["thresholds"]["steps"][0]["value"], Value::Null);
        assert_eq!(panels[2]["fieldConfig"]["defaults"]["noValue"], "instrument me");
    }

    #[test]
    fn test_collapsed_row_nests_panels() {
        let json = render(&sample(true));
        let panels = json["panels"].as_array().unwrap();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0]["collapsed"], true);
        assert_eq!(panels[0]["panels"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_top_level_metadata() {
        let json = render(&sample(false));
        assert_eq!(json["title"], "svc - Service Dashboard");
        assert_eq!(json["schemaVersion"], 39);
        assert_eq!(json["time"]["from"], "now-6h");
        assert_eq!(json["templating"]["list"][0]["name"], "datasource");
        assert!(json["id"].is_null());
    }

    #[test]
    fn test_every_shape_renders() {
        for kind in [PanelKind::Timeseries, PanelKind::Gauge, PanelKind::Stat, PanelKind::Table] {
            let panel = Panel::new("p", PanelShape::for_kind(kind), 6, 6);
            let out = render_panel(&panel);
            assert!(out["options"].is_object());
            assert_eq!(out["datasource"]["uid"], DATASOURCE_VARIABLE);
        }
    }
}
