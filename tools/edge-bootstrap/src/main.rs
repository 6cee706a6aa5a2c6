//! Lambda entrypoint.
//!
//! Reads one edge invocation payload from stdin, renders it through the
//! bundled server and writes the edge response to stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;
use edge_adapter::layout::{ASSET_SETTINGS_FILE, BOOTSTRAP_IDENTITY, ENV_SETTINGS_FILE, TASK_ROOT_ENV};
use edge_adapter::{error_response, AssetSettings, CommandRender, EdgeEvent, EdgeHandler, EnvSettings};
use http::StatusCode;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bootstrap", version)]
struct Cli {
    /// Print the adapter identity line and exit
    #[arg(long)]
    identify: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.identify {
        println!("{}", BOOTSTRAP_IDENTITY);
        return ExitCode::SUCCESS;
    }

    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{:#}", err), "invocation aborted");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let root = task_root()?;
    let handler = EdgeHandler::new(load_renderer(&root)?);

    let mut payload = String::new();
    tokio::io::stdin()
        .read_to_string(&mut payload)
        .await
        .context("failed to read invocation payload")?;

    let response = match EdgeEvent::from_json(&payload) {
        Ok(event) => handler.handle_or_error_response(event).await,
        Err(err) => {
            tracing::error!(error = %err, "rejected invocation payload");
            error_response(StatusCode::BAD_GATEWAY)
        }
    };

    println!("{}", response.to_json()?);
    Ok(())
}

/// `LAMBDA_TASK_ROOT`, or the directory holding this executable.
fn task_root() -> Result<PathBuf> {
    if let Some(root) = std::env::var_os(TASK_ROOT_ENV) {
        return Ok(PathBuf::from(root));
    }
    let exe = std::env::current_exe().context("failed to locate entrypoint")?;
    exe.parent()
        .map(PathBuf::from)
        .context("entrypoint has no parent directory")
}

fn load_renderer(root: &Path) -> Result<CommandRender> {
    let assets = AssetSettings::load(&root.join(ASSET_SETTINGS_FILE))?;
    let env = EnvSettings::load(&root.join(ENV_SETTINGS_FILE))?;

    tracing::debug!(
        root = %root.display(),
        asset_origin = %format!("{}://{}:{}{}", assets.protocol, assets.domain_name, assets.port, assets.path),
        env_keys = env.0.len(),
        "loaded settings"
    );

    Ok(CommandRender::from_env(root).with_settings(Value::Object(env.0)))
}
