//! Build errors and accumulated warnings.
//!
//! # Design Decisions
//! - Only an invalid service identity is fatal to a build
//! - Everything else degrades the dashboard and is reported as a `BuildWarning`
//! - Warnings travel alongside the artifact, never instead of it

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Fatal build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The service context has an empty or unusable name.
    #[error("invalid service identity: {0}")]
    InvalidService(String),

    /// A batch worker task panicked or was cancelled.
    #[error("build task failed: {0}")]
    Task(String),
}

/// Result type for dashboard builds.
pub type BuildResult<T> = Result<T, BuildError>;

/// Category of a non-fatal build condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Unknown template or dependency type; the item was skipped.
    Configuration,
    /// Discovery backend unreachable, timed out or returned garbage.
    DiscoveryUnavailable,
    /// No discovered metrics, so validation kept every panel.
    ValidationSkipped,
    /// A template panel could not be turned into a renderable panel.
    PanelConversion,
    /// A target references metrics that were not discovered.
    MissingMetrics,
    /// A panel had no fully backed target and was removed.
    PanelDropped,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WarningKind::Configuration => "configuration",
            WarningKind::DiscoveryUnavailable => "discovery-unavailable",
            WarningKind::ValidationSkipped => "validation-skipped",
            WarningKind::PanelConversion => "panel-conversion",
            WarningKind::MissingMetrics => "missing-metrics",
            WarningKind::PanelDropped => "panel-dropped",
        };
        f.write_str(label)
    }
}

/// A degraded-but-continuing condition collected during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl BuildWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}
