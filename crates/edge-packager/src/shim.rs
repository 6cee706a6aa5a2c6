//! Runtime adapter installation.

use std::path::{Path, PathBuf};
use std::process::Command;

use edge_adapter::layout::{BOOTSTRAP_NAME, ENTRYPOINT_FILE, IDENTIFY_FLAG};

use crate::error::{PackageError, Result};

/// Install the compiled adapter executable as the workspace entrypoint.
///
/// Any existing entrypoint is overwritten.
pub fn install_shim(workspace: &Path, adapter: &Path) -> Result<PathBuf> {
    let entrypoint = workspace.join(ENTRYPOINT_FILE);
    let content = std::fs::read(adapter).map_err(PackageError::io(adapter))?;
    std::fs::write(&entrypoint, &content).map_err(PackageError::io(&entrypoint))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&entrypoint, std::fs::Permissions::from_mode(0o755))
            .map_err(PackageError::io(&entrypoint))?;
    }

    tracing::info!(
        adapter = %adapter.display(),
        bytes = content.len(),
        "installed runtime adapter"
    );
    Ok(entrypoint)
}

/// Confirm `adapter` is the edge runtime entrypoint and return its identity line.
///
/// Runs the executable with `--identify`; anything that fails to start, exits
/// non-zero or answers with a foreign identity is rejected.
pub fn verify_adapter(adapter: &Path) -> Result<String> {
    let output = Command::new(adapter)
        .arg(IDENTIFY_FLAG)
        .output()
        .map_err(|e| {
            PackageError::Config(format!("adapter {} cannot be run: {}", adapter.display(), e))
        })?;

    let identity = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || identity.split_whitespace().next() != Some(BOOTSTRAP_NAME) {
        return Err(PackageError::Config(format!(
            "{} is not an edge runtime adapter (expected '{}' from {})",
            adapter.display(),
            BOOTSTRAP_NAME,
            IDENTIFY_FLAG
        )));
    }

    tracing::debug!(adapter = %adapter.display(), identity = %identity, "verified runtime adapter");
    Ok(identity)
}
