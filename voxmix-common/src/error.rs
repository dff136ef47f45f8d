//! Common error types for voxmix

use thiserror::Error;

/// Common result type for voxmix operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the voxmix crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel identifier outside the Music/SFX/Voice set
    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
