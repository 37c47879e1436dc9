//! Error types for ownertrace.
//!
//! Library crates use [`OwnerTraceError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ownertrace operations.
#[derive(Debug, thiserror::Error)]
pub enum OwnerTraceError {
    /// Input file could not be read as records, or `owners` is not a list.
    #[error("input format error: {message}")]
    InputFormat { message: String },

    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status after the retry policy gave up.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Profile page is missing structure the extractor depends on.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// The CSV output could not be written.
    #[error("output write error at {path:?}: {message}")]
    OutputWrite { path: PathBuf, message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OwnerTraceError>;

impl OwnerTraceError {
    /// Create an input format error from any displayable message.
    pub fn input_format(msg: impl Into<String>) -> Self {
        Self::InputFormat {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an output write error for `path`.
    pub fn output_write(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::OutputWrite {
            path: path.into(),
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

    /// Whether this error aborts the whole batch.
    ///
    /// Per-query failures (network, status, extraction) are downgraded to
    /// placeholder rows by the pipeline and never stop the run.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            Self::InputFormat { .. }
                | Self::OutputWrite { .. }
                | Self::Config { .. }
                | Self::Io { .. }
        )
    }
}
