// Vaultgate — Crypto Module
//
// Digest, salted digest, random hex, and passphrase-based AES encryption.
// Ciphertexts use the OpenSSL "Salted__" envelope so vault entries can be
// produced by any OpenSSL-compatible tool.

mod error;
mod provider;

pub use error::CryptoError;
pub use provider::{CryptoProvider, OpenSslCompatCipher};
