// Vaultgate — Vault Repository
//
// Lookup protocol: entry name = digest(target + key). A (target, key) pair is
// valid iff that name is present in the current directory listing; the entry
// content is a passphrase ciphertext opened with the same key.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::crypto::CryptoProvider;

use super::VaultError;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over vault storage, enabling directory-backed and in-test
/// implementations.
pub trait VaultStore: Send + Sync {
    /// Name under which the entry for `(target, key)` is stored.
    fn entry_name(&self, target: &str, key: &str) -> String;

    /// Current listing of stored entry names.
    fn entry_names(&self) -> Result<Vec<String>, VaultError>;

    /// Whether `(target, key)` names a stored entry.
    /// Linear in the number of entries; the vault is small and static.
    fn is_valid_key(&self, target: &str, key: &str) -> Result<bool, VaultError> {
        let name = self.entry_name(target, key);
        Ok(self.entry_names()?.iter().any(|entry| *entry == name))
    }

    /// Read the raw ciphertext of the entry for `(target, key)`.
    fn fetch_ciphertext(&self, target: &str, key: &str) -> Result<String, VaultError>;

    /// Read and decrypt the entry for `(target, key)`.
    /// An empty plaintext means a wrong key or corrupted entry.
    fn retrieve(&self, target: &str, key: &str) -> Result<Zeroizing<String>, VaultError>;

    /// Encrypt `plaintext` under `key` and store it as the entry for
    /// `(target, key)`. Used for out-of-band provisioning only.
    fn seal(&self, target: &str, key: &str, plaintext: &str) -> Result<PathBuf, VaultError>;
}

// ─── Directory Implementation ────────────────────────────────────────────────

/// A vault stored as one file per entry in a single directory.
pub struct DirectoryVault {
    root: PathBuf,
    crypto: Arc<dyn CryptoProvider>,
}

impl DirectoryVault {
    pub fn new(root: impl Into<PathBuf>, crypto: Arc<dyn CryptoProvider>) -> Self {
        Self {
            root: root.into(),
            crypto,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl VaultStore for DirectoryVault {
    fn entry_name(&self, target: &str, key: &str) -> String {
        self.crypto.salted_digest(target, key)
    }

    fn entry_names(&self) -> Result<Vec<String>, VaultError> {
        let dir = fs::read_dir(&self.root).map_err(|e| VaultError::io(&self.root, e))?;

        let mut names = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| VaultError::io(&self.root, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| VaultError::io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }

    fn fetch_ciphertext(&self, target: &str, key: &str) -> Result<String, VaultError> {
        let name = self.entry_name(target, key);
        let path = self.entry_path(&name);

        match fs::read_to_string(&path) {
            Ok(ciphertext) => Ok(ciphertext),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(VaultError::NotFound(name)),
            Err(e) => Err(VaultError::io(path, e)),
        }
    }

    fn retrieve(&self, target: &str, key: &str) -> Result<Zeroizing<String>, VaultError> {
        let ciphertext = self.fetch_ciphertext(target, key)?;
        let plaintext = Zeroizing::new(self.crypto.decrypt(&ciphertext, key));

        if plaintext.is_empty() {
            tracing::warn!(vault_target = %target, "Vault entry decrypted to nothing");
            return Err(VaultError::DecryptionFailed);
        }

        Ok(plaintext)
    }

    fn seal(&self, target: &str, key: &str, plaintext: &str) -> Result<PathBuf, VaultError> {
        fs::create_dir_all(&self.root).map_err(|e| VaultError::io(&self.root, e))?;

        let path = self.entry_path(&self.entry_name(target, key));
        let ciphertext = self.crypto.encrypt(plaintext, key);
        fs::write(&path, ciphertext).map_err(|e| VaultError::io(&path, e))?;

        tracing::info!(vault_target = %target, entry = %path.display(), "Vault entry sealed");
        Ok(path)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::OpenSslCompatCipher;

    fn setup_vault() -> (tempfile::TempDir, DirectoryVault) {
        let dir = tempfile::tempdir().unwrap();
        let vault = DirectoryVault::new(dir.path(), Arc::new(OpenSslCompatCipher::new()));
        (dir, vault)
    }

    #[test]
    fn test_entry_name_is_salted_digest() {
        let (_dir, vault) = setup_vault();
        let cipher = OpenSslCompatCipher::new();
        assert_eq!(
            vault.entry_name("alpha", "swordfish"),
            cipher.digest("alphaswordfish")
        );
    }

    #[test]
    fn test_is_valid_key_matches_listing() {
        let (_dir, vault) = setup_vault();
        vault.seal("alpha", "swordfish", "launch codes").unwrap();

        assert!(vault.is_valid_key("alpha", "swordfish").unwrap());
        assert!(!vault.is_valid_key("alpha", "wrong").unwrap());
        assert!(!vault.is_valid_key("beta", "swordfish").unwrap());
    }

    #[test]
    fn test_is_valid_key_for_externally_provisioned_entry() {
        let (dir, vault) = setup_vault();
        let name = OpenSslCompatCipher::new().salted_digest("gamma", "k3y");
        fs::write(dir.path().join(&name), "opaque").unwrap();

        assert!(vault.is_valid_key("gamma", "k3y").unwrap());
        assert_eq!(vault.fetch_ciphertext("gamma", "k3y").unwrap(), "opaque");
    }

    #[test]
    fn test_directories_are_not_entries() {
        let (dir, vault) = setup_vault();
        let name = vault.entry_name("alpha", "swordfish");
        fs::create_dir(dir.path().join(&name)).unwrap();

        assert!(vault.entry_names().unwrap().is_empty());
        assert!(!vault.is_valid_key("alpha", "swordfish").unwrap());
    }

    #[test]
    fn test_retrieve_decrypts_entry() {
        let (_dir, vault) = setup_vault();
        vault.seal("alpha", "swordfish", "launch codes").unwrap();

        let plaintext = vault.retrieve("alpha", "swordfish").unwrap();
        assert_eq!(plaintext.as_str(), "launch codes");
    }

    #[test]
    fn test_retrieve_missing_entry_is_not_found() {
        let (_dir, vault) = setup_vault();
        let result = vault.retrieve("alpha", "swordfish");
        assert!(matches!(result, Err(VaultError::NotFound(_))));
    }

    #[test]
    fn test_retrieve_corrupted_entry_fails_decryption() {
        let (dir, vault) = setup_vault();
        let name = vault.entry_name("alpha", "swordfish");
        let foreign = OpenSslCompatCipher::new().encrypt("payload", "another-key");
        fs::write(dir.path().join(name), foreign).unwrap();

        let result = vault.retrieve("alpha", "swordfish");
        assert!(matches!(result, Err(VaultError::DecryptionFailed)));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let vault = DirectoryVault::new(
            dir.path().join("does-not-exist"),
            Arc::new(OpenSslCompatCipher::new()),
        );

        let result = vault.is_valid_key("alpha", "swordfish");
        assert!(matches!(result, Err(VaultError::Io { .. })));
    }

    #[test]
    fn test_seal_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("vault");
        let vault = DirectoryVault::new(&root, Arc::new(OpenSslCompatCipher::new()));

        let path = vault.seal("alpha", "swordfish", "data").unwrap();
        assert!(path.starts_with(&root));
        assert!(path.exists());
    }
}
