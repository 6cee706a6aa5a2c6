//! CLI command implementations.

pub mod config;
pub mod inspect;
pub mod package;

use clap::{Args, Subcommand};
use serde_json::Value;

use crate::config::parse_kv;

/// Arguments for the package command.
#[derive(Args)]
pub struct PackageArgs {
    /// Bundle archive to package.
    pub bundle: String,

    /// Output directory for the artifacts.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Environment setting (KEY=VALUE, repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_kv)]
    pub env: Vec<(String, Value)>,

    /// Asset setting override (KEY=VALUE, repeatable).
    #[arg(long = "asset", value_name = "KEY=VALUE", value_parser = parse_kv)]
    pub asset: Vec<(String, Value)>,

    /// Compiled adapter executable installed as the entrypoint.
    #[arg(long)]
    pub adapter: Option<String>,
}

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Artifact archive to inspect.
    pub archive: String,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
