//! Error types for timbremap-export

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Parameter store error type
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed value in a text matrix file
    #[error("Parse error in {path} line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Stored values do not fit the expected shape
    #[error("Shape error in {path}: {reason}")]
    Shape { path: PathBuf, reason: String },

    /// Malformed `.npy` sibling
    #[error("Invalid npy file {path}: {reason}")]
    Npy { path: PathBuf, reason: String },

    /// Required directory or file is missing
    #[error("Missing: {0}")]
    Missing(PathBuf),

    /// Manifest could not be read or written
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Manifest declares a newer format than this build understands
    #[error("Unsupported format version {found} (supported up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Unsupported format or feature not enabled
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Invalid export options
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Stage construction or inversion failed
    #[error("Stage error: {0}")]
    Core(#[from] timbremap_core::Error),
}

/// Errors raised while building a pipeline from disk.
pub type LoadError = StoreError;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<toml::de::Error> for StoreError {
    fn from(e: toml::de::Error) -> Self {
        StoreError::Manifest(e.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(e: toml::ser::Error) -> Self {
        StoreError::Manifest(e.to_string())
    }
}
