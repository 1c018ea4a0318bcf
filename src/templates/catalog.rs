//! The built-in template catalog.

use crate::templates::template::Template;
use crate::templates::{service_types, technologies};

/// Every built-in service type followed by every built-in technology.
pub fn builtin_templates() -> Vec<Template> {
    let mut all = service_types::all();
    all.extend(technologies::all());
    all
}
