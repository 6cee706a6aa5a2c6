//! CLI configuration.
//!
//! The config file itself is [`PackagerConfig`]; this module adds the
//! command-line override layer on top of it.

use std::path::Path;

use anyhow::{Context, Result};
use edge_packager::PackagerConfig;
use serde_json::Value;

/// Config file names searched for, in order.
pub const CONFIG_NAMES: [&str; 3] = ["edge.toml", ".edge.toml", "edge.json"];

/// Load config from a file.
pub fn load(path: &Path) -> Result<PackagerConfig> {
    let mut config = PackagerConfig::load(path)
        .with_context(|| format!("Failed to load config file: {}", path.display()))?;

    // Adapter paths are relative to the config file.
    if let (Some(adapter), Some(dir)) = (config.shim.adapter.as_ref(), path.parent()) {
        if adapter.is_relative() {
            config.shim.adapter = Some(dir.join(adapter));
        }
    }

    Ok(config)
}

/// Parse a `KEY=VALUE` flag.
///
/// The value is read as JSON when it parses, otherwise kept as a string.
pub fn parse_kv(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
