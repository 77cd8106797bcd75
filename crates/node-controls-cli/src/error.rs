//! Error types for report handling.

use std::path::PathBuf;

use node_controls_core::CodecError;
use thiserror::Error;

/// A result type using `CliError`.
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur while loading configuration or reports.
#[derive(Debug, Error)]
pub enum CliError {
    /// A report file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A report file could not be decoded.
    #[error("invalid report {path}: {source}")]
    InvalidReport {
        /// The file being decoded.
        path: PathBuf,
        /// The underlying codec error.
        source: CodecError,
    },

    /// A configuration file could not be parsed.
    #[error("invalid config {path}: {source}")]
    InvalidConfig {
        /// The configuration file.
        path: PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// Encoding or decoding failed outside of a file context.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
