use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::money::Amount;

/// Errors raised by the encrypted persistence layer.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("salt file '{}' is corrupt: {reason}", .path.display())]
    CorruptSalt { path: PathBuf, reason: String },

    #[error("Invalid password or corrupted vault")]
    Authentication,

    #[error("vault contents could not be decoded: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("record set could not be encoded: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("vault '{}' is locked by another process", .0.display())]
    Locked(PathBuf),

    #[error("invalid key derivation parameters: {0}")]
    InvalidKdfParams(String),

    #[error("OS random generator unavailable")]
    Random,

    #[error("encryption failed")]
    Encryption,
}

impl VaultError {
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        VaultError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn corrupt_salt(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        VaultError::CorruptSalt {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the ledger controller.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("category must be 'income' or 'expense', got '{0}'")]
    InvalidCategory(String),

    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Amount),

    #[error("description is required")]
    EmptyDescription,
}
