//! Error types for the key store and clipboard guard
//!
//! No variant ever carries a secret value.

use std::path::PathBuf;
use thiserror::Error;

/// keyshelf errors
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("An API key for service '{service}' named '{name}' already exists")]
    DuplicateKey { service: String, name: String },

    #[error("API key not found: {0}")]
    NotFound(String),

    #[error("Key store at {} is corrupt: {reason}", .path.display())]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Key store at {} is unavailable: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl KeyError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KeyError::StorageUnavailable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        KeyError::CorruptStore {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KeyError>;
