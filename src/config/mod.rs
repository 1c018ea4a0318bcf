//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → discovery client, dashboard pipeline, batch runner, push client
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a run never reloads it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets are referenced by environment variable name only

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AppConfig, BatchConfig, DashboardConfig, DependencyDetail, DiscoveryConfig, GrafanaConfig,
    ObservabilityConfig,
};
pub use validation::ValidationError;
