// Vaultgate — Vault error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    /// The vault directory or an entry could not be read. This indicates
    /// misconfiguration, not an access violation.
    #[error("Vault I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Vault entry not found: {0}")]
    NotFound(String),

    #[error("Vault entry could not be decrypted")]
    DecryptionFailed,
}

impl VaultError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
