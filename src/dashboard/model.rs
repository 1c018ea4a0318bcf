//! Dashboard data model.
//!
//! Ids and grid coordinates are zero until layout assigns them.

use serde::Serialize;

use crate::templates::{PanelKind, ThresholdStep};

/// Placeholder replaced by the literal service name in the final pass.
pub const SERVICE_PLACEHOLDER: &str = "$service";

/// Shape of a panel with its shape-specific options.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum PanelShape {
    Timeseries { fill_opacity: u8 },
    Gauge { show_threshold_markers: bool },
    Stat { sparkline: bool },
    Table { show_header: bool },
}

impl PanelShape {
    /// Default options for a template panel kind.
    pub fn for_kind(kind: PanelKind) -> Self {
        match kind {
            PanelKind::Timeseries => PanelShape::Timeseries { fill_opacity: 10 },
            PanelKind::Gauge => PanelShape::Gauge {
                show_threshold_markers: true,
            },
            PanelKind::Stat => PanelShape::Stat { sparkline: true },
            PanelKind::Table => PanelShape::Table { show_header: true },
        }
    }

    pub fn kind(&self) -> PanelKind {
        match self {
            PanelShape::Timeseries { .. } => PanelKind::Timeseries,
            PanelShape::Gauge { .. } => PanelKind::Gauge,
            PanelShape::Stat { .. } => PanelKind::Stat,
            PanelShape::Table { .. } => PanelKind::Table,
        }
    }
}

/// One query of a panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub expr: String,
    pub legend: String,
    pub ref_id: String,
}

/// Reference ids A..Z, then AA, AB, ...
pub fn ref_id(index: usize) -> String {
    const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut n = index;
    let mut out = Vec::new();
    loop {
        out.push(LETTERS[n % 26]);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Position and size on the 24-column grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub id: u32,
    pub title: String,
    pub shape: PanelShape,
    pub targets: Vec<Target>,
    pub unit: Option<String>,
    pub decimals: Option<u8>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub thresholds: Vec<ThresholdStep>,
    /// Setup hint shown instead of data; set on guidance placeholders.
    pub guidance: Option<String>,
    pub description: Option<String>,
    pub grid: GridPos,
}

impl Panel {
    pub fn new(title: impl Into<String>, shape: PanelShape, width: u32, height: u32) -> Self {
        Self {
            id: 0,
            title: title.into(),
            shape,
            targets: Vec::new(),
            unit: None,
            decimals: None,
            min: None,
            max: None,
            thresholds: Vec::new(),
            guidance: None,
            description: None,
            grid: GridPos {
                x: 0,
                y: 0,
                w: width,
                h: height,
            },
        }
    }

    /// A query-less panel that tells the reader how to get data into it.
    pub fn guidance(
        title: impl Into<String>,
        kind: PanelKind,
        width: u32,
        height: u32,
        message: impl Into<String>,
    ) -> Self {
        let mut panel = Self::new(title, PanelShape::for_kind(kind), width, height);
        panel.guidance = Some(message.into());
        panel
    }

    pub fn push_target(&mut self, expr: impl Into<String>, legend: impl Into<String>) {
        let ref_id = ref_id(self.targets.len());
        self.targets.push(Target {
            expr: expr.into(),
            legend: legend.into(),
            ref_id,
        });
    }

    pub fn is_guidance(&self) -> bool {
        self.guidance.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub id: u32,
    pub title: String,
    pub collapsed: bool,
    pub y: u32,
    pub panels: Vec<Panel>,
}

impl Row {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            collapsed: false,
            y: 0,
            panels: Vec::new(),
        }
    }

    pub fn collapsed(mut self) -> Self {
        self.collapsed = true;
        self
    }
}

/// Dashboard variable. Only datasource selection is generated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateVariable {
    pub name: String,
    pub label: String,
    /// Datasource plugin type offered by the picker.
    pub query: String,
}

impl TemplateVariable {
    pub fn datasource() -> Self {
        Self {
            name: "datasource".to_string(),
            label: "Data source".to_string(),
            query: "prometheus".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub uid: String,
    pub title: String,
    pub tags: Vec<String>,
    pub timezone: String,
    pub editable: bool,
    pub time_from: String,
    pub time_to: String,
    pub refresh: String,
    pub schema_version: u32,
    pub variables: Vec<TemplateVariable>,
    pub rows: Vec<Row>,
    /// Panels outside any row, laid out after all rows.
    pub panels: Vec<Panel>,
}

impl Dashboard {
    pub fn all_panels(&self) -> impl Iterator<Item = &Panel> {
        self.rows
            .iter()
            .flat_map(|r| r.panels.iter())
            .chain(self.panels.iter())
    }

    fn all_panels_mut(&mut self) -> impl Iterator<Item = &mut Panel> {
        self.rows
            .iter_mut()
            .flat_map(|r| r.panels.iter_mut())
            .chain(self.panels.iter_mut())
    }

    pub fn panel_count(&self) -> usize {
        self.all_panels().count()
    }

    pub fn row(&self, title: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.title == title)
    }

    /// Replace every `$service` in titles, tags, query text, legends and
    /// panel prose.
    pub fn substitute_service(&mut self, service: &str) {
        let replace = |s: &mut String| {
            if s.contains(SERVICE_PLACEHOLDER) {
                *s = s.replace(SERVICE_PLACEHOLDER, service);
            }
        };
        replace(&mut self.title);
        for tag in &mut self.tags {
            replace(tag);
        }
        for row in &mut self.rows {
            replace(&mut row.title);
        }
        for panel in self.all_panels_mut() {
            replace(&mut panel.title);
            for target in &mut panel.targets {
                replace(&mut target.expr);
                replace(&mut target.legend);
            }
            if let Some(g) = panel.guidance.as_mut() {
                replace(g);
            }
            if let Some(d) = panel.description.as_mut() {
                replace(d);
            }
        }
    }
}
