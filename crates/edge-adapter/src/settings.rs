//! Settings documents written at packaging time and read at runtime.
//!
//! Both documents are plain JSON objects. [`merge_asset_settings`] produces the
//! asset document from the default table; [`AssetSettings::load`] and
//! [`EnvSettings::load`] are the typed loaders used by the deployed function.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SettingsError;

/// A flat key to value settings mapping.
pub type SettingsMap = Map<String, Value>;

/// Connection settings for the static asset origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSettings {
    pub domain_name: String,
    /// Seconds.
    pub keepalive_timeout: u64,
    /// Path prefix prepended to asset requests.
    pub path: String,
    pub port: u16,
    pub protocol: String,
    /// Seconds.
    pub read_timeout: u64,
    pub ssl_protocols: Vec<String>,
    /// Caller keys with no typed counterpart.
    #[serde(flatten)]
    pub extra: SettingsMap,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            domain_name: "static-assets.linc.sh".to_string(),
            keepalive_timeout: 5,
            path: String::new(),
            port: 443,
            protocol: "https".to_string(),
            read_timeout: 30,
            ssl_protocols: vec!["TLSv1.1".to_string(), "TLSv1.2".to_string()],
            extra: SettingsMap::new(),
        }
    }
}

impl AssetSettings {
    /// The default table as a raw mapping.
    pub fn defaults() -> SettingsMap {
        match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map,
            _ => SettingsMap::new(),
        }
    }

    /// Load a written asset settings document.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        load_document(path)
    }

    /// Parse an asset settings document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check a raw mapping against the typed model.
    pub fn from_map(map: &SettingsMap) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map.clone()))
    }
}

/// Shallow merge of caller asset settings over the default table.
///
/// Caller keys replace matching default keys wholesale; defaults the caller
/// does not mention survive unchanged.
pub fn merge_asset_settings(overrides: &SettingsMap) -> SettingsMap {
    let mut merged = AssetSettings::defaults();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Caller-supplied environment settings. No defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvSettings(pub SettingsMap);

impl EnvSettings {
    /// Load a written env settings document.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        load_document(path)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value for `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn load_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
