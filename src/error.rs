//! Unified error handling for the mo crate
//!
//! Each module owns a specific error enum ([`RegistryError`], [`ServerError`]
//! and friends). [`Error`] wraps the ones the command layer meets so it can
//! use `?` across module boundaries.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::server::{ClientError, ConfigError, RegistryError, ServerError, WatchError};

/// Unified error type for the mo crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// A command-line file argument does not exist
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors, e.g. resolving the working directory
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
