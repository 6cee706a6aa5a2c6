//! Pinned runtime dependency download and installation.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use edge_adapter::layout::DEPENDENCY_DIR;
use flate2::read::GzDecoder;
use tar::Archive;

use crate::config::DependencySpec;
use crate::error::{PackageError, Result};

/// Directory npm-style tarballs unpack into.
const TARBALL_ROOT: &str = "package";

/// Downloads a pinned dependency tarball and installs it into a workspace.
#[derive(Debug, Clone)]
pub struct DependencyFetcher {
    client: reqwest::Client,
    spec: DependencySpec,
}

impl DependencyFetcher {
    /// Create a fetcher for `spec`.
    pub fn new(spec: DependencySpec) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(spec.timeout_secs))
            .build()
            .map_err(|e| PackageError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, spec })
    }

    pub fn spec(&self) -> &DependencySpec {
        &self.spec
    }

    /// Download, verify and install the dependency into `workspace`.
    ///
    /// Returns the installed module directory.
    pub async fn install(&self, workspace: &Path) -> Result<PathBuf> {
        let bytes = self.download().await?;

        match self.spec.content_hash()? {
            Some(hash) => {
                hash.verify(&self.spec.tarball_url(), &bytes)?;
                tracing::debug!(integrity = %hash, "dependency integrity verified");
            }
            None => tracing::warn!(
                dependency = %self.spec.name,
                version = %self.spec.version,
                "no integrity pinned for dependency, skipping verification"
            ),
        }

        let tarball = workspace.join(self.spec.tarball_file_name());
        std::fs::write(&tarball, &bytes).map_err(PackageError::io(&tarball))?;

        let installed = install_tarball(&tarball, workspace, &self.spec.name);

        // The tarball never ships, even when installation failed.
        if let Err(e) = std::fs::remove_file(&tarball) {
            tracing::debug!(error = %e, tarball = %tarball.display(), "failed to remove tarball");
        }

        installed
    }

    /// Fetch the tarball bytes.
    pub async fn download(&self) -> Result<Vec<u8>> {
        let url = self.spec.tarball_url();
        tracing::info!(url = %url, "downloading dependency");

        let network = |reason: String| PackageError::Network {
            url: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(network(format!("HTTP {}", status)));
        }

        let bytes = response.bytes().await.map_err(|e| network(e.to_string()))?;
        tracing::debug!(url = %url, bytes = bytes.len(), "downloaded dependency");
        Ok(bytes.to_vec())
    }
}

/// Unpack a gzipped tarball into the workspace's dependency directory and
/// rename its root to `module_name`.
pub fn install_tarball(tarball: &Path, workspace: &Path, module_name: &str) -> Result<PathBuf> {
    let modules = workspace.join(DEPENDENCY_DIR);
    std::fs::create_dir_all(&modules).map_err(PackageError::io(&modules))?;

    let file = File::open(tarball).map_err(PackageError::io(tarball))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive
        .unpack(&modules)
        .map_err(|e| PackageError::extraction(tarball, e))?;

    let from = modules.join(TARBALL_ROOT);
    if !from.is_dir() {
        return Err(PackageError::extraction(
            tarball,
            format!("tarball has no '{}' directory", TARBALL_ROOT),
        ));
    }

    let to = modules.join(module_name);
    if to.exists() {
        tracing::debug!(module = %to.display(), "replacing bundled module");
        std::fs::remove_dir_all(&to).map_err(PackageError::io(&to))?;
    }
    std::fs::rename(&from, &to).map_err(PackageError::io(&to))?;

    tracing::info!(module = %to.display(), "installed dependency");
    Ok(to)
}
