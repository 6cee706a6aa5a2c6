//! Packaging orchestrator.

use std::fmt;
use std::path::{Path, PathBuf};

use edge_adapter::{merge_asset_settings, AssetSettings, SettingsMap};
use serde::Serialize;

use crate::archive::{write_archive, ArchiveSpec, ArtifactReport};
use crate::config::PackagerConfig;
use crate::error::Result;
use crate::extract::extract_bundle;
use crate::fetch::DependencyFetcher;
use crate::normalize::normalize_server_path;
use crate::settings::{write_asset_settings, write_env_settings};
use crate::shim::install_shim;
use crate::workspace::Workspace;

/// A pipeline step, reported to progress observers as it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Extract,
    FetchDependency,
    Normalize,
    WriteSettings,
    InstallShim,
    Archive,
    Cleanup,
}

impl Step {
    /// Number of steps in a run.
    pub const TOTAL: usize = 7;

    /// One-based position of this step.
    pub fn number(self) -> usize {
        match self {
            Step::Extract => 1,
            Step::FetchDependency => 2,
            Step::Normalize => 3,
            Step::WriteSettings => 4,
            Step::InstallShim => 5,
            Step::Archive => 6,
            Step::Cleanup => 7,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::Extract => "Extracting bundle",
            Step::FetchDependency => "Installing runtime dependency",
            Step::Normalize => "Normalizing server path",
            Step::WriteSettings => "Writing settings",
            Step::InstallShim => "Installing entrypoint",
            Step::Archive => "Writing artifacts",
            Step::Cleanup => "Removing workspace",
        };
        f.write_str(label)
    }
}

/// Outcome of a successful packaging run.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub workspace_id: String,
    pub output_dir: PathBuf,
    pub artifacts: Vec<ArtifactReport>,
}

type ProgressFn = Box<dyn Fn(Step) + Send + Sync>;

/// Runs the packaging pipeline.
///
/// Each call to [`Packager::package`] owns a fresh workspace under the
/// output directory, so concurrent runs can share one output directory.
pub struct Packager {
    config: PackagerConfig,
    adapter: PathBuf,
    fetcher: DependencyFetcher,
    progress: Option<ProgressFn>,
}

impl Packager {
    /// Create a packager. Fails if the config cannot drive a run.
    pub fn new(config: PackagerConfig) -> Result<Self> {
        config.validate()?;
        let adapter = config.shim.adapter_path()?;
        let fetcher = DependencyFetcher::new(config.dependency.clone())?;
        Ok(Self {
            config,
            adapter,
            fetcher,
            progress: None,
        })
    }

    /// Observe steps as they start.
    pub fn on_progress(mut self, f: impl Fn(Step) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn config(&self) -> &PackagerConfig {
        &self.config
    }

    /// The adapter executable installed as the entrypoint.
    pub fn adapter(&self) -> &Path {
        &self.adapter
    }

    /// Package `bundle` into `lambda.zip` and `assets.zip` under `output_dir`.
    ///
    /// `asset_settings` is merged over the default asset table and must
    /// still load as [`AssetSettings`]; a mistyped value fails the run
    /// before any workspace exists. The workspace is removed on every exit
    /// path; any error means no artifact from this run should be trusted.
    pub async fn package(
        &self,
        bundle: &Path,
        output_dir: &Path,
        env_settings: &SettingsMap,
        asset_settings: &SettingsMap,
    ) -> Result<PackageReport> {
        let asset_settings = merge_asset_settings(asset_settings);
        AssetSettings::from_map(&asset_settings)?;
        let workspace = Workspace::create(output_dir)?;

        tracing::info!(
            bundle = %bundle.display(),
            workspace = %workspace.path().display(),
            "packaging bundle"
        );

        let result = self
            .run(&workspace, bundle, output_dir, env_settings, &asset_settings)
            .await;

        self.report(Step::Cleanup);
        let workspace_id = workspace.id().to_string();
        if let Err(err) = workspace.reap() {
            tracing::warn!(error = %err, "workspace cleanup failed");
        }

        let artifacts = result?;
        tracing::info!(artifacts = artifacts.len(), "packaging complete");

        Ok(PackageReport {
            workspace_id,
            output_dir: output_dir.to_path_buf(),
            artifacts,
        })
    }

    async fn run(
        &self,
        workspace: &Workspace,
        bundle: &Path,
        output_dir: &Path,
        env_settings: &SettingsMap,
        asset_settings: &SettingsMap,
    ) -> Result<Vec<ArtifactReport>> {
        let root = workspace.path();

        self.report(Step::Extract);
        extract_bundle(bundle, root)?;

        self.report(Step::FetchDependency);
        self.fetcher.install(root).await?;

        self.report(Step::Normalize);
        normalize_server_path(root)?;

        self.report(Step::WriteSettings);
        write_asset_settings(root, asset_settings)?;
        write_env_settings(root, env_settings)?;

        self.report(Step::InstallShim);
        install_shim(root, &self.adapter)?;

        self.report(Step::Archive);
        let lambda = write_archive(&ArchiveSpec::lambda(), root, output_dir)?;
        let assets = write_archive(&ArchiveSpec::assets(), root, output_dir)?;

        Ok(vec![lambda, assets])
    }

    fn report(&self, step: Step) {
        tracing::info!(step = step.number(), total = Step::TOTAL, "{}", step);
        if let Some(progress) = &self.progress {
            progress(step);
        }
    }
}
