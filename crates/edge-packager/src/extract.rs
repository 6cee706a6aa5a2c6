//! Bundle extraction into a workspace.

use std::fs::File;
use std::path::Path;

use zip::ZipArchive;

use crate::error::{PackageError, Result};

/// Unpack the bundle archive at `bundle` into `target`.
///
/// `target` is created if absent and must otherwise be empty; extraction
/// never merges into or overwrites existing content. Entries that would
/// land outside `target` are rejected.
pub fn extract_bundle(bundle: &Path, target: &Path) -> Result<usize> {
    ensure_empty_dir(target)?;

    let file = File::open(bundle).map_err(PackageError::io(bundle))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| PackageError::extraction(bundle, e))?;
    let entries = archive.len();

    archive
        .extract(target)
        .map_err(|e| PackageError::extraction(bundle, e))?;

    tracing::info!(
        bundle = %bundle.display(),
        workspace = %target.display(),
        entries,
        "extracted bundle"
    );
    Ok(entries)
}

fn ensure_empty_dir(target: &Path) -> Result<()> {
    if !target.exists() {
        tracing::debug!(dir = %target.display(), "creating extraction target");
        return std::fs::create_dir_all(target).map_err(PackageError::io(target));
    }

    if !target.is_dir() {
        return Err(PackageError::InvalidState {
            path: target.to_path_buf(),
            reason: "extraction target is not a directory".into(),
        });
    }

    let mut entries = std::fs::read_dir(target).map_err(PackageError::io(target))?;
    if entries.next().is_some() {
        return Err(PackageError::InvalidState {
            path: target.to_path_buf(),
            reason: "extraction target must be absent or empty".into(),
        });
    }
    Ok(())
}
