//! Server entrypoint normalization.

use std::path::Path;

use edge_adapter::layout::{NESTED_SERVER_FILE, SERVER_FILE};

use crate::error::{PackageError, Result};

/// Copy a nested server entrypoint to the canonical top-level path.
///
/// Does nothing when the canonical file already exists or there is no
/// nested file. Returns whether a copy was made.
pub fn normalize_server_path(workspace: &Path) -> Result<bool> {
    let nested = workspace.join(NESTED_SERVER_FILE);
    let canonical = workspace.join(SERVER_FILE);

    if !nested.is_file() || canonical.exists() {
        return Ok(false);
    }

    std::fs::copy(&nested, &canonical).map_err(PackageError::io(&canonical))?;
    tracing::info!(
        from = NESTED_SERVER_FILE,
        to = SERVER_FILE,
        "relocated server entrypoint"
    );
    Ok(true)
}
