//! Deterministic artifact archives.
//!
//! Archive bytes depend only on workspace content: entries are sorted by
//! their `/`-separated relative path, every entry carries the DOS epoch
//! timestamp and fixed permissions, and no directory entries or extra
//! fields are written.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use edge_adapter::layout::{
    ASSETS_ARCHIVE, ASSETS_DIR, ASSET_SETTINGS_FILE, DEPENDENCY_DIR, ENTRYPOINT_FILE,
    ENV_SETTINGS_FILE, LAMBDA_ARCHIVE, SERVER_FILE,
};
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::{PackageError, Result};
use crate::integrity::{ContentHash, HashAlgorithm};

const FILE_MODE: u32 = 0o644;
const EXECUTABLE_MODE: u32 = 0o755;

/// One include pattern, relative to the workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Include {
    /// A single file, e.g. `./server.js`.
    File(String),
    /// A directory and everything below it, e.g. `./node_modules/**`.
    Tree(String),
}

impl Include {
    /// Parse `./path` or `./dir/**`.
    pub fn parse(pattern: &str) -> Self {
        let trimmed = pattern.trim_start_matches("./");
        match trimmed.strip_suffix("/**") {
            Some(dir) => Include::Tree(dir.to_string()),
            None => Include::File(trimmed.to_string()),
        }
    }

    fn relative(&self) -> &str {
        match self {
            Include::File(path) | Include::Tree(path) => path,
        }
    }
}

/// An include with its requirement flag.
#[derive(Debug, Clone)]
pub struct IncludeRule {
    pub include: Include,
    pub required: bool,
}

impl IncludeRule {
    pub fn required(pattern: &str) -> Self {
        Self {
            include: Include::parse(pattern),
            required: true,
        }
    }

    pub fn optional(pattern: &str) -> Self {
        Self {
            include: Include::parse(pattern),
            required: false,
        }
    }
}

/// A named archive and the workspace subset it contains.
#[derive(Debug, Clone)]
pub struct ArchiveSpec {
    pub name: String,
    pub rules: Vec<IncludeRule>,
    /// Entries stored with executable permissions.
    pub executables: Vec<String>,
}

impl ArchiveSpec {
    /// `lambda.zip`: entrypoint, settings, server file and dependency tree.
    pub fn lambda() -> Self {
        Self {
            name: LAMBDA_ARCHIVE.to_string(),
            rules: vec![
                IncludeRule::required(&format!("./{}", ENTRYPOINT_FILE)),
                IncludeRule::required(&format!("./{}", ASSET_SETTINGS_FILE)),
                IncludeRule::required(&format!("./{}", ENV_SETTINGS_FILE)),
                IncludeRule::required(&format!("./{}", SERVER_FILE)),
                IncludeRule::optional(&format!("./{}/**", DEPENDENCY_DIR)),
            ],
            executables: vec![ENTRYPOINT_FILE.to_string()],
        }
    }

    /// `assets.zip`: the static asset tree only.
    pub fn assets() -> Self {
        Self {
            name: ASSETS_ARCHIVE.to_string(),
            rules: vec![IncludeRule::optional(&format!("./{}/**", ASSETS_DIR))],
            executables: Vec::new(),
        }
    }

    /// Resolve the rules against `workspace` into sorted archive entries.
    pub fn collect(&self, workspace: &Path) -> Result<BTreeMap<String, PathBuf>> {
        let mut entries = BTreeMap::new();

        for rule in &self.rules {
            let relative = rule.include.relative();
            let path = workspace.join(relative);
            let before = entries.len();

            match &rule.include {
                Include::File(_) => {
                    if path.is_file() {
                        entries.insert(relative.to_string(), path);
                    }
                }
                Include::Tree(_) => {
                    if path.is_dir() {
                        collect_tree(&path, relative, &mut entries)?;
                    }
                }
            }

            if rule.required && entries.len() == before {
                return Err(PackageError::packaging(
                    &self.name,
                    format!("missing required member '{}'", relative),
                ));
            }
        }

        Ok(entries)
    }
}

fn collect_tree(dir: &Path, prefix: &str, entries: &mut BTreeMap<String, PathBuf>) -> Result<()> {
    let listing = std::fs::read_dir(dir).map_err(PackageError::io(dir))?;
    for entry in listing {
        let entry = entry.map_err(PackageError::io(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(PackageError::io(&path))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = format!("{}/{}", prefix, name);

        if file_type.is_dir() {
            collect_tree(&path, &relative, entries)?;
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            entries.insert(relative, path);
        } else {
            tracing::debug!(path = %path.display(), "skipping non-file entry");
        }
    }
    Ok(())
}

/// Summary of one written artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReport {
    pub name: String,
    pub path: PathBuf,
    pub entries: usize,
    pub bytes: u64,
    pub sha256: String,
}

/// Write the archive described by `spec` from `workspace` into `output_dir`.
///
/// The archive is built inside the workspace and renamed into place once
/// complete, so `output_dir` never holds a partial artifact.
pub fn write_archive(spec: &ArchiveSpec, workspace: &Path, output_dir: &Path) -> Result<ArtifactReport> {
    let entries = spec.collect(workspace)?;
    let staged = workspace.join(format!(".{}.partial", spec.name));
    let output = output_dir.join(&spec.name);

    let file = File::create(&staged).map_err(PackageError::io(&staged))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));

    for (name, path) in &entries {
        let mode = if spec.executables.iter().any(|e| e == name) {
            EXECUTABLE_MODE
        } else {
            FILE_MODE
        };
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(mode);

        writer
            .start_file(name.as_str(), options)
            .map_err(|e| PackageError::packaging(&spec.name, e))?;

        let mut source = BufReader::new(File::open(path).map_err(PackageError::io(path))?);
        std::io::copy(&mut source, &mut writer).map_err(PackageError::io(path))?;
        tracing::debug!(artifact = %spec.name, entry = %name, "archived entry");
    }

    let mut inner = writer
        .finish()
        .map_err(|e| PackageError::packaging(&spec.name, e))?;
    std::io::Write::flush(&mut inner).map_err(PackageError::io(&staged))?;
    drop(inner);

    std::fs::rename(&staged, &output).map_err(PackageError::io(&output))?;

    let report = describe_artifact(&output)?;
    tracing::info!(
        artifact = %report.name,
        entries = report.entries,
        bytes = report.bytes,
        "wrote artifact"
    );
    Ok(report)
}

/// Read back an artifact's entry count, size and SHA-256.
pub fn describe_artifact(path: &Path) -> Result<ArtifactReport> {
    let content = std::fs::read(path).map_err(PackageError::io(path))?;
    let archive = ZipArchive::new(std::io::Cursor::new(&content))
        .map_err(|e| PackageError::extraction(path, e))?;

    Ok(ArtifactReport {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: path.to_path_buf(),
        entries: archive.len(),
        bytes: content.len() as u64,
        sha256: ContentHash::compute(HashAlgorithm::Sha256, &content).hash,
    })
}

/// Entry names and uncompressed sizes of an artifact, in archive order.
pub fn list_entries(path: &Path) -> Result<Vec<(String, u64)>> {
    let file = File::open(path).map_err(PackageError::io(path))?;
    let mut archive = ZipArchive::new(file).map_err(|e| PackageError::extraction(path, e))?;

    let mut out = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| PackageError::extraction(path, e))?;
        out.push((entry.name().to_string(), entry.size()));
    }
    Ok(out)
}
