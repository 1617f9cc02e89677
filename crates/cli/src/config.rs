//! Optional TOML configuration for the `quill` CLI.
//!
//! # Example
//!
//! ```toml
//! output = "json"
//!
//! [context]
//! uid = 1
//! lang = "en_US"
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value as Json};

use crate::OutputFormat;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Default output format, overridden by `--output`.
    pub output: Option<OutputFormat>,
    /// Entries merged into every seed context.
    #[serde(default)]
    pub context: Map<String, Json>,
}

pub fn read_config(path: &Path) -> Result<Config, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

/// Read a JSON object from `path`.
pub fn read_json_object(path: &Path) -> Result<Map<String, Json>, String> {
    match read_json(path)? {
        Json::Object(map) => Ok(map),
        _ => Err(format!("'{}' must contain a JSON object", path.display())),
    }
}

pub fn read_json(path: &Path) -> Result<Json, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("invalid JSON in '{}': {}", path.display(), e))
}
