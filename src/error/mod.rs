//! Error types and Result aliases for imgwatch.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using imgwatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for imgwatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// Image transform error.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    /// Server/API error.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Source directory of a pair is missing.
    #[error("watch directory not found: {path}")]
    DirectoryNotFound { path: String },

    /// Directory index outside the configured pairs.
    #[error("invalid directory index {index} (have {count})")]
    InvalidDirectoryIndex { index: usize, count: usize },

    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// Failed to remove a derived artifact.
    #[error("failed to delete artifact '{path}': {reason}")]
    ArtifactDeleteFailed { path: String, reason: String },
}

/// Image transform errors.
///
/// Every variant is a per-file failure: handlers count it and move on.
#[derive(Error, Debug)]
pub enum TransformError {
    /// Source could not be opened or decoded.
    #[error("failed to open image '{path}': {reason}")]
    Open { path: String, reason: String },

    /// No capture date in the EXIF block.
    #[error("no capture date in EXIF metadata of '{path}'")]
    MissingDate { path: String },

    /// Capture date present but unparsable.
    #[error("invalid EXIF date '{value}' in '{path}'")]
    InvalidDate { path: String, value: String },

    /// Target width is not usable.
    #[error("invalid resize width: {0}")]
    InvalidWidth(i64),

    /// Overlay font could not be loaded.
    #[error("font error: {0}")]
    Font(String),

    /// Overlay logo could not be loaded.
    #[error("logo error: {0}")]
    Logo(String),

    /// Derived image could not be written.
    #[error("failed to save image '{path}': {reason}")]
    Save { path: String, reason: String },
}

/// Server/API errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {address}: {reason}")]
    BindFailed { address: String, reason: String },

    /// Request handling error.
    #[error("request error: {0}")]
    Request(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error was caused by the caller (bad index) rather than the server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Watcher(WatcherError::InvalidDirectoryIndex { .. })
        )
    }
}

impl WatcherError {
    /// Create a directory-not-found error.
    pub fn not_found(path: &std::path::Path) -> Self {
        Self::DirectoryNotFound {
            path: path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests;
