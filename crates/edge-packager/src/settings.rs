//! Settings documents written into the workspace.

use std::path::{Path, PathBuf};

use edge_adapter::layout::{ASSET_SETTINGS_FILE, ENV_SETTINGS_FILE};
use edge_adapter::SettingsMap;

use crate::error::{PackageError, Result};

/// Write the merged asset settings document. Overwrites any previous file.
pub fn write_asset_settings(workspace: &Path, settings: &SettingsMap) -> Result<PathBuf> {
    write_document(&workspace.join(ASSET_SETTINGS_FILE), settings)
}

/// Write the environment settings document. Overwrites any previous file.
pub fn write_env_settings(workspace: &Path, settings: &SettingsMap) -> Result<PathBuf> {
    write_document(&workspace.join(ENV_SETTINGS_FILE), settings)
}

fn write_document(path: &Path, settings: &SettingsMap) -> Result<PathBuf> {
    let mut content = serde_json::to_vec_pretty(settings)?;
    content.push(b'\n');
    std::fs::write(path, content).map_err(PackageError::io(path))?;
    tracing::debug!(path = %path.display(), keys = settings.len(), "wrote settings");
    Ok(path.to_path_buf())
}
