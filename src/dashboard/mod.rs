//! Dashboard construction subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceInput + DiscoveryOutcome
//!     → pipeline::Draft (builder.rs)
//!         SLOs row           (slo.rs)
//!         Service Health row (health.rs)
//!         dependency rows    (dependencies.rs)
//!     → $service substitution
//!     → validator.rs (drop panels with no backing metrics)
//!     → layout.rs (ids, 24-column grid)
//!     → render.rs (JSON)
//! ```
//!
//! # Design Decisions
//! - Panel shapes are a closed enum; rendering matches it exhaustively
//! - Warnings accumulate alongside the dashboard and never abort a build
//! - Batch builds share the registry and a per-selector discovery cache

pub mod batch;
pub mod builder;
pub mod dependencies;
pub mod health;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod slo;
pub mod validator;

pub use batch::BatchRunner;
pub use layout::GridLayoutEngine;
pub use model::{Dashboard, GridPos, Panel, PanelShape, Row, Target, TemplateVariable};
pub use pipeline::{build_dashboard, BuildOutput, Draft, LaidOut, Resolved, Validated};
pub use validator::{extract_metrics, validate_dashboard, QUERY_KEYWORDS};
