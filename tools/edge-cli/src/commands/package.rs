//! Package a bundle into deployable artifacts.

use anyhow::{bail, Context as _, Result};
use edge_packager::{verify_adapter, Packager};

use super::PackageArgs;
use crate::context::Context;

/// Run the package command.
pub async fn run(args: PackageArgs, ctx: &Context) -> Result<()> {
    let bundle = ctx.resolve_path(&args.bundle);
    if !bundle.is_file() {
        bail!("Bundle not found: {}", bundle.display());
    }

    let output_dir = match args.output {
        Some(ref dir) => ctx.resolve_path(dir),
        None => ctx.output_dir(),
    };

    // Flags override the config file
    let mut config = ctx.config.clone();
    if let Some(ref adapter) = args.adapter {
        config.shim.adapter = Some(ctx.resolve_path(adapter));
    }
    let mut env_settings = config.env.clone();
    env_settings.extend(args.env);
    let mut asset_settings = config.assets.clone();
    asset_settings.extend(args.asset);

    if config.dependency.integrity.is_none() {
        ctx.output.warn(&format!(
            "No integrity pinned for {}@{}; the download will not be verified",
            config.dependency.name, config.dependency.version
        ));
    }

    let adapter = config
        .shim
        .adapter_path()
        .context("Invalid packager configuration")?;
    let identity = verify_adapter(&adapter)?;
    ctx.output.debug(&format!("Adapter {} ({})", adapter.display(), identity));

    ctx.output.title("Packaging bundle");
    ctx.output.field("Bundle", bundle.display());
    ctx.output.field("Output", output_dir.display());

    let progress = ctx.output.steps();
    let observer = progress.clone();
    let packager = Packager::new(config)
        .context("Invalid packager configuration")?
        .on_progress(move |step| observer.step(step));

    let result = packager
        .package(&bundle, &output_dir, &env_settings, &asset_settings)
        .await;
    progress.finish();

    let report = result.with_context(|| format!("Failed to package {}", bundle.display()))?;
    if ctx.output.emit_json(&report) {
        return Ok(());
    }

    ctx.output.success("Packaging complete!");
    for artifact in &report.artifacts {
        ctx.output.artifact(artifact);
    }

    Ok(())
}
