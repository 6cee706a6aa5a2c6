//! Ephemeral packaging workspace and its guaranteed cleanup.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{PackageError, Result};

/// Scoped owner of one packaging run's workspace directory.
///
/// The directory is created under the output directory with a random UUID
/// name and removed when the guard is reaped or dropped, whichever comes
/// first. Dropping covers every early-return and panic path.
#[derive(Debug)]
pub struct Workspace {
    id: String,
    output_dir: PathBuf,
    path: PathBuf,
    reaped: bool,
}

impl Workspace {
    /// Create a fresh, empty workspace under `output_dir`.
    pub fn create(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir).map_err(PackageError::io(output_dir))?;

        let id = Uuid::new_v4().simple().to_string();
        let path = output_dir.join(&id);

        match std::fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(PackageError::InvalidState {
                    path,
                    reason: "workspace identifier collision".into(),
                });
            }
            Err(e) => return Err(PackageError::io(&path)(e)),
        }

        tracing::debug!(workspace = %path.display(), "created workspace");

        Ok(Self {
            id,
            output_dir: output_dir.to_path_buf(),
            path,
            reaped: false,
        })
    }

    /// Random identifier naming this workspace.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Workspace root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `relative` inside the workspace.
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.path.join(relative)
    }

    /// Remove the workspace now and report the outcome.
    pub fn reap(mut self) -> Result<()> {
        self.reaped = true;
        reap_workspace(&self.output_dir, &self.path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        if let Err(err) = reap_workspace(&self.output_dir, &self.path) {
            tracing::warn!(error = %err, "workspace cleanup failed");
        }
    }
}

/// Recursively remove `workspace`, which must live directly under `output_dir`.
///
/// A workspace that is already gone counts as removed.
pub fn reap_workspace(output_dir: &Path, workspace: &Path) -> Result<()> {
    if workspace.parent() != Some(output_dir) {
        return Err(PackageError::InvalidState {
            path: workspace.to_path_buf(),
            reason: format!("not a workspace of {}", output_dir.display()),
        });
    }

    match std::fs::remove_dir_all(workspace) {
        Ok(()) => {
            tracing::debug!(workspace = %workspace.display(), "removed workspace");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PackageError::Cleanup {
            path: workspace.to_path_buf(),
            source,
        }),
    }
}
