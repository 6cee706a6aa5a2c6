//! Inspect a packaged artifact.

use anyhow::{bail, Context as _, Result};
use edge_packager::{describe_artifact, list_entries, ArtifactReport};
use serde::Serialize;

use super::InspectArgs;
use crate::context::Context;

#[derive(Serialize)]
struct Inspection {
    #[serde(flatten)]
    artifact: ArtifactReport,
    files: Vec<FileEntry>,
}

#[derive(Serialize)]
struct FileEntry {
    name: String,
    size: u64,
}

/// Run the inspect command.
pub async fn run(args: InspectArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.archive);
    if !path.is_file() {
        bail!("Archive not found: {}", path.display());
    }

    let artifact = describe_artifact(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let entries = list_entries(&path)?;

    let inspection = Inspection {
        artifact,
        files: entries
            .iter()
            .map(|(name, size)| FileEntry {
                name: name.clone(),
                size: *size,
            })
            .collect(),
    };
    if ctx.output.emit_json(&inspection) {
        return Ok(());
    }

    ctx.output.artifact(&inspection.artifact);
    ctx.output.entries(&entries);

    Ok(())
}
