//! Error types for compenrich.
//!
//! Library crates use [`CompenrichError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all compenrich operations.
#[derive(Debug, thiserror::Error)]
pub enum CompenrichError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to the completion API.
    #[error("network error: {0}")]
    Network(String),

    /// The completion API answered with a non-success status.
    #[error("completion API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The completion API answered 2xx but the envelope was unusable.
    #[error("completion error: {0}")]
    Completion(String),

    /// The input table could not be opened or parsed.
    #[error("input error: {message}")]
    Input { message: String },

    /// The result store could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON/TOML parsing or serialization error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CompenrichError>;

impl CompenrichError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an input error from any displayable message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
