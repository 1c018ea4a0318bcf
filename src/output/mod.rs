//! Output subsystem: files on disk and the dashboard API.
//!
//! # Data Flow
//! ```text
//! BuildOutput.json
//!     → write_json (pretty, trailing newline)
//!     → DashboardEnvelope {dashboard, overwrite, message} → GrafanaClient::push
//! ```

pub mod push;

use std::io;
use std::path::Path;

use serde_json::Value;

pub use push::{DashboardEnvelope, GrafanaClient, PushError, PushResponse};

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json(path: &Path, value: &Value) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    text.push('\n');
    std::fs::write(path, text)
}

/// File name for a service's dashboard.
pub fn file_name(service: &str) -> String {
    format!("{}.dashboard.json", service)
}
