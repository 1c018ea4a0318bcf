//! Live metric discovery subsystem.
//!
//! # Data Flow
//! ```text
//! service name
//!     → client.rs (selector, series API, metadata API)
//!         on failure → exposition.rs (raw text, service filter)
//!     → classifier.rs (technology group, inferred type)
//!     → DiscoveryResult (immutable snapshot, grouped by technology and type)
//!     → cache.rs (per-selector, batch builds only)
//! ```
//!
//! # Design Decisions
//! - Discovery is best-effort: failures produce an empty snapshot, never an abort
//! - Snapshots are per service and discarded after the build
//! - Classification is a pure function of the metric name and reported type

pub mod cache;
pub mod classifier;
pub mod client;
pub mod exposition;
pub mod retry;
pub mod types;

pub use cache::{DiscoveryCache, DiscoveryOutcome};
pub use client::{DiscoveryClient, DiscoveryError};
pub use types::{DiscoveredMetric, DiscoveryResult, MetricType};
