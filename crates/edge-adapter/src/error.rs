//! Adapter and settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while translating a single edge invocation.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The payload could not be decoded as an edge event.
    #[error("malformed edge event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    /// The event carried no request record.
    #[error("edge event contains no request record")]
    MissingRequest,

    /// The request had no usable Host header.
    #[error("edge request has no Host header")]
    MissingHost,

    /// Method, URL, header or body was rejected while building the request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The render collaborator failed.
    #[error("render failed: {0:#}")]
    Render(anyhow::Error),
}

impl From<http::Error> for AdapterError {
    fn from(err: http::Error) -> Self {
        AdapterError::InvalidRequest(err.to_string())
    }
}

/// Errors raised by the typed settings loader.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
