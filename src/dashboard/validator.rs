//! Second-pass panel validation against the discovered metric set.
//!
//! # Responsibilities
//! - Extract metric identifiers from query text
//! - Drop panels none of whose targets are fully backed by discovered metrics
//! - Explain every missing metric in a warning
//!
//! # Design Decisions
//! - Only an identifier immediately followed by `{` or `[` counts as a metric;
//!   bare names are left alone, so the check can only under-report
//! - Panels without targets (guidance placeholders) always survive
//! - An empty discovered set means "unknown", not "nothing exists": skip

use crate::dashboard::model::{Dashboard, Panel};
use crate::discovery::types::DiscoveryResult;
use crate::error::{BuildWarning, WarningKind};
use crate::observability::metrics;

/// Words that can precede `{` or `[` in query text without naming a metric.
pub const QUERY_KEYWORDS: &[&str] = &[
    // aggregation operators
    "sum", "min", "max", "avg", "group", "stddev", "stdvar", "count", "count_values",
    "bottomk", "topk", "quantile", "limitk", "limit_ratio",
    // aggregation and vector matching modifiers
    "by", "without", "on", "ignoring", "group_left", "group_right", "offset", "bool",
    // set operators
    "and", "or", "unless",
    // functions
    "abs", "absent", "absent_over_time", "ceil", "changes", "clamp", "clamp_max",
    "clamp_min", "day_of_month", "day_of_week", "day_of_year", "days_in_month", "delta",
    "deriv", "exp", "floor", "histogram_quantile", "holt_winters", "hour", "idelta",
    "increase", "irate", "label_join", "label_replace", "ln", "log2", "log10", "minute",
    "month", "predict_linear", "rate", "resets", "round", "scalar", "sgn", "sort",
    "sort_desc", "sqrt", "time", "timestamp", "vector", "year", "avg_over_time",
    "min_over_time", "max_over_time", "sum_over_time", "count_over_time",
    "quantile_over_time", "stddev_over_time", "stdvar_over_time", "last_over_time",
    "present_over_time",
];

/// Metric identifiers referenced by `expr`, in order of first use.
pub fn extract_metrics(expr: &str) -> Vec<String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut found: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' | '`' => {
                i = skip_quoted(&chars, i);
            }
            // Range and subquery selectors hold durations, never metrics.
            '[' => {
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                i += 1;
            }
            // Dashboard variables such as $service or $__rate_interval.
            '$' => {
                i += 1;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
            }
            c if c.is_ascii_digit() => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                    i += 1;
                }
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let followed = matches!(chars.get(i), Some('{') | Some('['));
                if followed && !QUERY_KEYWORDS.contains(&ident.as_str()) && !found.contains(&ident) {
                    found.push(ident);
                }
            }
            _ => i += 1,
        }
    }
    found
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

/// Index just past the closing quote starting at `open`.
fn skip_quoted(chars: &[char], open: usize) -> usize {
    let quote = chars[open];
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if quote != '`' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    i
}

/// Result of validating one list of panels.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub kept: Vec<Panel>,
    pub dropped: usize,
    pub warnings: Vec<BuildWarning>,
}

/// Keep panels with at least one fully backed target. Assumes a non-empty
/// discovered set; see `validate_dashboard` for the skip rule.
pub fn validate_panels(panels: Vec<Panel>, discovered: &DiscoveryResult) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for panel in panels {
        if panel.targets.is_empty() {
            outcome.kept.push(panel);
            continue;
        }

        let mut any_complete = false;
        for target in &panel.targets {
            let missing: Vec<String> = extract_metrics(&target.expr)
                .into_iter()
                .filter(|m| !discovered.contains(m))
                .collect();
            if missing.is_empty() {
                any_complete = true;
            } else {
                outcome.warnings.push(BuildWarning::new(
                    WarningKind::MissingMetrics,
                    format!(
                        "panel '{}' target {}: metrics not found: {}",
                        panel.title,
                        target.ref_id,
                        missing.join(", ")
                    ),
                ));
            }
        }

        if any_complete {
            outcome.kept.push(panel);
        } else {
            outcome.dropped += 1;
            outcome.warnings.push(BuildWarning::new(
                WarningKind::PanelDropped,
                format!("panel '{}' dropped: no target has all of its metrics", panel.title),
            ));
        }
    }
    outcome
}

/// Validate every row and standalone panel, removing rows left empty.
pub fn validate_dashboard(dashboard: &mut Dashboard, discovered: &DiscoveryResult) -> Vec<BuildWarning> {
    if discovered.is_empty() {
        return vec![BuildWarning::new(
            WarningKind::ValidationSkipped,
            "no discovered metrics; panels were not validated",
        )];
    }

    let mut warnings = Vec::new();
    let mut dropped = 0;

    let rows = std::mem::take(&mut dashboard.rows);
    for mut row in rows {
        let outcome = validate_panels(std::mem::take(&mut row.panels), discovered);
        dropped += outcome.dropped;
        warnings.extend(outcome.warnings);
        if outcome.kept.is_empty() {
            tracing::debug!(row = %row.title, "Row emptied by validation, removed");
            continue;
        }
        row.panels = outcome.kept;
        dashboard.rows.push(row);
    }

    let outcome = validate_panels(std::mem::take(&mut dashboard.panels), discovered);
    dropped += outcome.dropped;
    warnings.extend(outcome.warnings);
    dashboard.panels = outcome.kept;

    metrics::record_panels_dropped(dropped);
    warnings
}
