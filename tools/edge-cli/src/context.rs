//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use edge_packager::PackagerConfig;

use crate::config::{self, CONFIG_NAMES};
use crate::output::Output;

/// Default artifact directory, relative to the working directory.
const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Execution context for CLI commands.
pub struct Context {
    /// Packager configuration.
    pub config: PackagerConfig,
    /// File the configuration was loaded from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config_path = match config_path {
            Some(path) => Some(resolve(&cwd, path)),
            // Try to find config in current directory or parent directories
            None => Self::find_config(&cwd),
        };

        let config = match &config_path {
            Some(path) => {
                output.debug(&format!("Using config {}", path.display()));
                config::load(path)?
            }
            None => PackagerConfig::default(),
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let config_path = current.join(name);
                if config_path.is_file() {
                    return Some(config_path);
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Get the default artifact output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.cwd.join(DEFAULT_OUTPUT_DIR)
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        resolve(&self.cwd, path)
    }
}

fn resolve(cwd: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}
