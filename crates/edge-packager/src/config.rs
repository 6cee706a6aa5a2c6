//! Packager configuration.

use std::path::{Path, PathBuf};

use edge_adapter::layout::ENTRYPOINT_FILE;
use edge_adapter::SettingsMap;
use serde::{Deserialize, Serialize};

use crate::error::{PackageError, Result};
use crate::integrity::ContentHash;

/// Packager configuration file (`edge.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackagerConfig {
    /// Pinned runtime dependency.
    #[serde(default)]
    pub dependency: DependencySpec,

    /// Runtime adapter installed as the lambda entrypoint.
    #[serde(default)]
    pub shim: ShimConfig,

    /// Asset settings merged over the default table.
    #[serde(default)]
    pub assets: SettingsMap,

    /// Environment settings.
    #[serde(default)]
    pub env: SettingsMap,
}

impl PackagerConfig {
    /// Load config from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(PackageError::io(path))?;

        if path.extension().map_or(false, |ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| {
                PackageError::Config(format!("failed to parse JSON config {}: {}", path.display(), e))
            })
        } else {
            toml::from_str(&content).map_err(|e| {
                PackageError::Config(format!("failed to parse TOML config {}: {}", path.display(), e))
            })
        }
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if path.extension().map_or(false, |ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self).map_err(|e| PackageError::Config(e.to_string()))?
        };

        std::fs::write(path, content).map_err(PackageError::io(path))
    }

    /// Check that the config can drive a packaging run.
    pub fn validate(&self) -> Result<()> {
        self.dependency.validate()?;
        self.shim.adapter_path()?;
        Ok(())
    }
}

/// A pinned-version dependency fetched from a tarball registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Package name, also the installed module directory name.
    #[serde(default = "default_dependency_name")]
    pub name: String,

    /// Exact version.
    #[serde(default = "default_dependency_version")]
    pub version: String,

    /// Registry base URL.
    #[serde(default = "default_registry")]
    pub registry: String,

    /// Optional SRI hash of the tarball.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,

    /// Download timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_dependency_name() -> String {
    "node-fetch".to_string()
}

fn default_dependency_version() -> String {
    "2.3.0".to_string()
}

fn default_registry() -> String {
    "https://registry.npmjs.org".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for DependencySpec {
    fn default() -> Self {
        Self {
            name: default_dependency_name(),
            version: default_dependency_version(),
            registry: default_registry(),
            integrity: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DependencySpec {
    /// Registry URL of the pinned tarball.
    pub fn tarball_url(&self) -> String {
        format!(
            "{}/{}/-/{}-{}.tgz",
            self.registry.trim_end_matches('/'),
            self.name,
            self.name,
            self.version
        )
    }

    /// Local file name the tarball is downloaded to.
    pub fn tarball_file_name(&self) -> String {
        format!("{}.tgz", self.name)
    }

    /// Parsed integrity hash, if pinned.
    pub fn content_hash(&self) -> Result<Option<ContentHash>> {
        match &self.integrity {
            Some(sri) => Ok(Some(ContentHash::from_sri(sri)?)),
            None => Ok(None),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.contains(['/', '\\']) || self.name == ".." {
            return Err(PackageError::Config(format!(
                "invalid dependency name '{}'",
                self.name
            )));
        }
        if self.version.is_empty() {
            return Err(PackageError::Config("dependency version must be pinned".into()));
        }
        self.content_hash()?;
        Ok(())
    }
}

/// Runtime adapter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShimConfig {
    /// Path to the compiled adapter executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<PathBuf>,
}

impl ShimConfig {
    /// The configured adapter, or the `bootstrap` built next to the running tool.
    pub fn adapter_path(&self) -> Result<PathBuf> {
        self.adapter
            .clone()
            .or_else(default_adapter_path)
            .ok_or_else(|| {
                PackageError::Config(
                    "no adapter executable configured ([shim] adapter) and no bootstrap next to this tool"
                        .into(),
                )
            })
    }
}

fn default_adapter_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let sibling = exe
        .parent()?
        .join(format!("{}{}", ENTRYPOINT_FILE, std::env::consts::EXE_SUFFIX));
    sibling.is_file().then_some(sibling)
}

/// Generate a default edge.toml config file.
pub fn generate_default_config() -> String {
    r#"# Edge bundle packager configuration

[dependency]
name = "node-fetch"
version = "2.3.0"
registry = "https://registry.npmjs.org"
# integrity = "sha512-..."
timeout_secs = 60

[shim]
# Compiled runtime adapter installed as the lambda entrypoint.
# Defaults to the bootstrap built alongside this tool.
# adapter = "target/release/bootstrap"

[assets]
# domainName = "static-assets.example.com"
# path = "/static"

[env]
# API_URL = "https://api.example.com"
"#
    .to_string()
}
