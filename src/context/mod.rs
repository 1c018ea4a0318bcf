//! Build input subsystem.
//!
//! # Data Flow
//! ```text
//! service description (loaded elsewhere)
//!     → ServiceContext (identity: name, team, tier, type)
//!     → Resource list (SLO, Dependencies, Observability, other kinds ignored)
//!     → dashboard pipeline
//! ```
//!
//! # Design Decisions
//! - The service name is the only hard precondition of a build
//! - Unknown resource kinds deserialize to `Resource::Other` and are skipped

pub mod types;

pub use types::{
    DependenciesSpec, DependencyRef, IndicatorSpec, ObservabilitySpec, Resource, ServiceContext,
    ServiceInput, SloKind, SloSpec,
};
