//! Template subsystem.
//!
//! # Data Flow
//! ```text
//! built-in catalog (service types + technologies)
//!     → TemplateRegistry (alias lookup)
//!     → extends chain flattened, child shadows parent
//!     → ResolvedTemplate (intents, SLO formulas, panels)
//!     → resolver + dashboard builders
//! ```
//!
//! # Design Decisions
//! - Templates are plain data built in code, never loaded at runtime
//! - Intents name metrics semantically; concrete names come from discovery
//! - Resolutions are memoized and shared behind `Arc`

pub mod catalog;
pub mod intent;
pub mod registry;
pub mod service_types;
pub mod technologies;
pub mod template;

pub use intent::{Attribute, InstrumentType, LevelFilter, MetricIntent, RequirementLevel};
pub use registry::TemplateRegistry;
pub use template::{
    PanelKind, PanelTemplate, QueryTemplate, ResolvedTemplate, SloFormula, Template, TemplateKind,
    ThresholdStep,
};
