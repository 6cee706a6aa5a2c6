//! Edge bundle packager.
//!
//! Turns a portable server bundle into the two artifacts an edge proxy
//! platform deploys:
//! - `lambda.zip` - entrypoint, settings, server code and runtime dependency
//! - `assets.zip` - the static asset tree
//!
//! The pipeline runs inside an ephemeral [`Workspace`] that is removed on
//! every exit path. Archives are deterministic: the same workspace content
//! always yields the same bytes.
//!
//! # Example
//!
//! ```ignore
//! use edge_packager::{Packager, PackagerConfig};
//!
//! let config = PackagerConfig::load("edge.toml".as_ref())?;
//! let packager = Packager::new(config)?;
//! let report = packager
//!     .package(bundle, output_dir, &env_settings, &asset_settings)
//!     .await?;
//! for artifact in &report.artifacts {
//!     println!("{} {}", artifact.name, artifact.sha256);
//! }
//! ```

pub mod archive;
pub mod config;
mod error;
pub mod extract;
pub mod fetch;
pub mod integrity;
pub mod normalize;
mod pipeline;
pub mod settings;
pub mod shim;
pub mod workspace;

pub use archive::{describe_artifact, list_entries, ArchiveSpec, ArtifactReport};
pub use config::{generate_default_config, DependencySpec, PackagerConfig, ShimConfig};
pub use error::{PackageError, Result};
pub use fetch::DependencyFetcher;
pub use integrity::{ContentHash, HashAlgorithm, IntegrityError};
pub use pipeline::{PackageReport, Packager, Step};
pub use shim::verify_adapter;
pub use workspace::{reap_workspace, Workspace};
