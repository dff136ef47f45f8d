//! Error types for voxmix-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Playback-path failures (missing clip, failed stream) are logged and absorbed
//! by the voice engine; these variants surface from the lower layers.

use thiserror::Error;

/// Main error type for voxmix-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Streaming fetch errors (network, bad status, timeout)
    #[error("Streaming error for {locator}: {message}")]
    Stream { locator: String, message: String },

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Errors from the common crate (config, channel parsing)
    #[error(transparent)]
    Common(#[from] voxmix_common::Error),
}

/// Convenience Result type using voxmix-ap Error
pub type Result<T> = std::result::Result<T, Error>;
