// Vaultgate — Vault Module
//
// Read-only access to ciphertext entries stored as files in a directory.
// Each file is named by the salted hash of (target, key), so neither the key
// nor the target appears on disk in the clear.

mod error;
mod repository;

pub use error::VaultError;
pub use repository::{DirectoryVault, VaultStore};
