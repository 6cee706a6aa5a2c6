//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};
use edge_packager::{generate_default_config, verify_adapter};

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { force } => init_config(force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.emit_json(&ctx.config) {
        return Ok(());
    }

    ctx.output.title("Current Configuration");
    match ctx.config_path {
        Some(ref path) => ctx.output.field("file", path.display()),
        None => ctx.output.field("file", "(defaults)"),
    }

    let dependency = &ctx.config.dependency;
    ctx.output.section("dependency");
    ctx.output.field("name", &dependency.name);
    ctx.output.field("version", &dependency.version);
    ctx.output.field("registry", &dependency.registry);
    ctx.output.field("tarball", dependency.tarball_url());
    if let Some(ref integrity) = dependency.integrity {
        ctx.output.field("integrity", integrity);
    }
    ctx.output.field("timeout_secs", dependency.timeout_secs);

    ctx.output.section("shim");
    match (&ctx.config.shim.adapter, ctx.config.shim.adapter_path()) {
        (Some(adapter), _) => ctx.output.field("adapter", adapter.display()),
        (None, Ok(bundled)) => ctx.output.field("adapter", format!("{} (bundled)", bundled.display())),
        (None, Err(_)) => ctx.output.field("adapter", "(not set)"),
    }

    for (section, settings) in [("assets", &ctx.config.assets), ("env", &ctx.config.env)] {
        if settings.is_empty() {
            continue;
        }
        ctx.output.section(section);
        for (key, value) in settings {
            ctx.output.field(key, value);
        }
    }

    Ok(())
}

async fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join("edge.toml");

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config())?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.title("Validating configuration");

    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if let Err(e) = ctx.config.validate() {
        errors.push(e.to_string());
    }

    // The installed entrypoint must be the runtime adapter itself
    if let Ok(adapter) = ctx.config.shim.adapter_path() {
        match verify_adapter(&adapter) {
            Ok(identity) => ctx.output.debug(&format!("shim.adapter is {}", identity)),
            Err(e) => errors.push(e.to_string()),
        }
    }

    // Check registry scheme
    let registry = &ctx.config.dependency.registry;
    if !registry.starts_with("https://") {
        warnings.push(format!("dependency.registry '{}' is not https", registry));
    }

    if ctx.config.dependency.integrity.is_none() {
        warnings.push("dependency.integrity is not pinned; downloads are not verified".to_string());
    }

    // Print results
    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}
