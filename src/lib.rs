//! Service dashboard generator.
//!
//! Turns a declarative service description into a monitoring dashboard whose
//! panels are backed by metrics confirmed to exist in a Prometheus-compatible
//! backend, degrading to naming conventions and guidance panels when they are not.

// Catalog and inputs
pub mod context;
pub mod templates;

// Live metrics
pub mod discovery;
pub mod resolver;

// Build and output
pub mod dashboard;
pub mod output;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod observability;

pub use config::AppConfig;
pub use context::{Resource, ServiceContext, ServiceInput};
pub use dashboard::{build_dashboard, BatchRunner, BuildOutput, Dashboard};
pub use discovery::{DiscoveryCache, DiscoveryClient, DiscoveryOutcome, DiscoveryResult};
pub use error::{BuildError, BuildResult, BuildWarning, WarningKind};
pub use templates::TemplateRegistry;
