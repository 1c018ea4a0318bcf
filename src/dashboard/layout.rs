//! Grid layout: ids and coordinates, assigned once.
//!
//! # Design Decisions
//! - Fixed 24-column grid; widths are clamped to 1..=24
//! - Row headers take one grid unit; a row's panels start right below it
//! - Panels wrap to a new line when they would cross the right edge
//! - A finished row advances the cursor by at least the row height
//! - Pure function of the ordering: same input, same layout

use crate::dashboard::model::{Dashboard, GridPos, Panel};

pub const GRID_COLUMNS: u32 = 24;
pub const ROW_HEIGHT: u32 = 8;

/// Running placement state.
#[derive(Debug, Default)]
struct Cursor {
    next_id: u32,
    y: u32,
}

impl Cursor {
    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Place `panels` left to right from the current cursor, wrapping at the
    /// grid edge, then move the cursor below them.
    fn place(&mut self, panels: &mut [Panel]) {
        if panels.is_empty() {
            return;
        }
        let mut x = 0;
        let mut line_y = self.y;
        let mut line_h = 0;
        for panel in panels.iter_mut() {
            let w = panel.grid.w.clamp(1, GRID_COLUMNS);
            let h = panel.grid.h.max(1);
            if x + w > GRID_COLUMNS {
                x = 0;
                line_y += line_h;
                line_h = 0;
            }
            panel.id = self.id();
            panel.grid = GridPos { x, y: line_y, w, h };
            x += w;
            line_h = line_h.max(h);
        }
        self.y = line_y + line_h.max(ROW_HEIGHT);
    }
}

pub struct GridLayoutEngine;

impl GridLayoutEngine {
    /// Assign ids from 1 and grid positions to every row and panel.
    pub fn finalize(dashboard: &mut Dashboard) {
        let mut cursor = Cursor::default();
        for row in dashboard.rows.iter_mut() {
            row.id = cursor.id();
            row.y = cursor.y;
            cursor.y += 1;
            cursor.place(&mut row.panels);
        }
        cursor.place(&mut dashboard.panels);
        tracing::debug!(
            uid = %dashboard.uid,
            rows = dashboard.rows.len(),
            last_id = cursor.next_id,
            height = cursor.y,
            "Layout finalized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::context::ServiceContext;
    use crate::dashboard::builder::dashboard_shell;
    use crate::dashboard::model::{PanelShape, Row};
    use crate::templates::PanelKind;
    use std::collections::HashSet;

    fn panel(w: u32, h: u32) -> Panel {
        Panel::new("p", PanelShape::for_kind(PanelKind::Stat), w, h)
    }

    fn dashboard(rows: Vec<Vec<(u32, u32)>>, standalone: Vec<(u32, u32)>) -> Dashboard {
        let mut d = dashboard_shell(
            &ServiceContext::new("svc", "team", "tier", "api"),
            &DashboardConfig::default(),
        );
        for (i, sizes) in rows.into_iter().enumerate() {
            let mut row = Row::new(format!("row {}", i));
            row.panels = sizes.into_iter().map(|(w, h)| panel(w, h)).collect();
            d.rows.push(row);
        }
        d.panels = standalone.into_iter().map(|(w, h)| panel(w, h)).collect();
        d
    }

    #[test]
    fn test_wrap_and_row_advance() {
        let mut d = dashboard(vec![vec![(8, 8), (8, 8), (8, 8), (12, 6)], vec![(24, 4)]], vec![]);
        GridLayoutEngine::finalize(&mut d);

        assert_eq!(d.rows[0].y, 0);
        let grids: Vec<(u32, u32)> = d.rows[0].panels.iter().map(|p| (p.grid.x, p.grid.y)).collect();
        assert_eq!(grids, vec![(0, 1), (8, 1), (16, 1), (0, 9)]);

        // Second line ends at 9 + max(6, 8).
        assert_eq!(d.rows[1].y, 17);
        assert_eq!(d.rows[1].panels[0].grid, GridPos { x: 0, y: 18, w: 24, h: 4 });
    }

    #[test]
    fn test_sequential_unique_ids() {
        let mut d = dashboard(vec![vec![(6, 8); 5], vec![], vec![(12, 8); 2]], vec![(24, 8)]);
        GridLayoutEngine::finalize(&mut d);
        let mut ids: Vec<u32> = d.rows.iter().map(|r| r.id).collect();
        ids.extend(d.all_panels().map(|p| p.id));
        let unique: HashSet<u32> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(d.rows[0].id, 1);
        assert_eq!(d.rows[0].panels[0].id, 2);
        assert_eq!(*ids.iter().max().unwrap() as usize, ids.len());
    }

    #[test]
    fn test_bounds() {
        let mut d = dashboard(vec![vec![(30, 8), (0, 8), (23, 8), (5, 3)]], vec![(13, 8), (13, 8)]);
        GridLayoutEngine::finalize(&mut d);
        for p in d.all_panels() {
            assert!(p.grid.w >= 1 && p.grid.w <= GRID_COLUMNS);
            assert!(p.grid.x + p.grid.w <= GRID_COLUMNS, "{:?}", p.grid);
        }
        // Standalone panels follow the rows and wrap.
        let standalone: Vec<(u32, u32)> = d.panels.iter().map(|p| (p.grid.x, p.grid.y)).collect();
        let below = d.rows[0].panels.iter().map(|p| p.grid.y + p.grid.h).max().unwrap();
        assert!(standalone[0].1 >= below);
        assert_eq!(standalone[1].0, 0);
        assert!(standalone[1].1 > standalone[0].1);
    }

    #[test]
    fn test_no_overlap_within_row() {
        let mut d = dashboard(vec![vec![(10, 12), (10, 4), (10, 8), (4, 8)]], vec![]);
        GridLayoutEngine::finalize(&mut d);
        let panels = &d.rows[0].panels;
        for (i, a) in panels.iter().enumerate() {
            for b in panels.iter().skip(i + 1) {
                let disjoint_x = a.grid.x + a.grid.w <= b.grid.x || b.grid.x + b.grid.w <= a.grid.x;
                let disjoint_y = a.grid.y + a.grid.h <= b.grid.y || b.grid.y + b.grid.h <= a.grid.y;
                assert!(disjoint_x || disjoint_y, "{:?} overlaps {:?}", a.grid, b.grid);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let make = || dashboard(vec![vec![(8, 8), (16, 8), (9, 8)], vec![(7, 5)]], vec![(24, 8)]);
        let mut a = make();
        let mut b = make();
        GridLayoutEngine::finalize(&mut a);
        GridLayoutEngine::finalize(&mut b);
        assert_eq!(a, b);
    }
}
