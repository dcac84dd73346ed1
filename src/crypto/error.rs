// Vaultgate — Crypto error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Ciphertext is missing the salted envelope header")]
    MissingHeader,

    #[error("Ciphertext body has invalid length {0}")]
    InvalidLength(usize),

    #[error("Decryption failed: wrong passphrase or corrupted data")]
    BadPadding,

    #[error("Decrypted data is not valid UTF-8")]
    InvalidUtf8,
}
