//! Runtime adapter for edge proxy invocations.
//!
//! This crate ships inside the packaged lambda artifact and provides:
//! - `EdgeEvent` / `EdgeResponse` - The platform's invocation wire format
//! - `EdgeHandler` - Per-process context translating events into `http` requests
//! - `Render` trait - The bundled application's entrypoint
//! - `CommandRender` - `Render` backed by the bundled server process
//! - `ExclusionPolicy` - Response headers the platform manages itself
//! - `AssetSettings` / `EnvSettings` - Typed loaders for the packaged settings
//!
//! # Example
//!
//! ```ignore
//! use edge_adapter::{EdgeEvent, EdgeHandler, Render};
//!
//! // Built once per process
//! let handler = EdgeHandler::new(MyServer::load()?);
//!
//! // Once per invocation
//! let event = EdgeEvent::from_json(&payload)?;
//! let response = handler.handle(event).await?;
//! println!("{}", response.to_json()?);
//! ```

mod body;
mod error;
mod event;
mod handler;
mod headers;
pub mod layout;
mod process;
pub mod settings;

pub use body::*;
pub use error::*;
pub use event::*;
pub use handler::*;
pub use headers::*;
pub use process::CommandRender;
pub use settings::{merge_asset_settings, AssetSettings, EnvSettings, SettingsMap};
