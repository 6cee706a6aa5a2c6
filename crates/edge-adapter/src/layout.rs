//! File names shared by the packaged lambda workspace and the runtime.

/// Canonical entrypoint: the compiled adapter executable.
pub const ENTRYPOINT_FILE: &str = "bootstrap";

/// Merged asset settings document.
pub const ASSET_SETTINGS_FILE: &str = "asset_settings.json";

/// Caller-supplied environment settings document.
pub const ENV_SETTINGS_FILE: &str = "env_settings.json";

/// Canonical top-level server entrypoint.
pub const SERVER_FILE: &str = "server.js";

/// Nested server entrypoint some bundles ship instead of [`SERVER_FILE`].
pub const NESTED_SERVER_FILE: &str = "server/bundle.js";

/// Dependency tree root.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Static asset tree root.
pub const ASSETS_DIR: &str = "_assets";

/// Lambda artifact name.
pub const LAMBDA_ARCHIVE: &str = "lambda.zip";

/// Static assets artifact name.
pub const ASSETS_ARCHIVE: &str = "assets.zip";

/// Flag that makes the entrypoint print [`BOOTSTRAP_IDENTITY`] and exit.
pub const IDENTIFY_FLAG: &str = "--identify";

/// First word of the entrypoint's identity line.
pub const BOOTSTRAP_NAME: &str = "edge-adapter-bootstrap";

/// Identity line printed by the entrypoint for [`IDENTIFY_FLAG`].
pub const BOOTSTRAP_IDENTITY: &str = concat!("edge-adapter-bootstrap ", env!("CARGO_PKG_VERSION"));

/// Environment variable overriding the render command line.
pub const RENDER_COMMAND_ENV: &str = "EDGE_RENDER_COMMAND";

/// Environment variable naming the unpacked lambda root.
pub const TASK_ROOT_ENV: &str = "LAMBDA_TASK_ROOT";
