// Vaultgate — Crypto Provider
//
// The primitives the gate relies on, behind a trait so the vault and the
// HTTP utility routes can be exercised against a single implementation.
//
// Envelope format (OpenSSL `enc -aes-256-cbc -md md5` compatible):
//   base64( "Salted__" || salt[8] || AES-256-CBC-PKCS7(plaintext) )
// with key and IV derived by EVP_BytesToKey(MD5, 1 iteration) from the
// passphrase and salt.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, Iv, Key, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

use super::CryptoError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Magic prefix of the salted envelope.
const SALT_HEADER: &[u8; 8] = b"Salted__";

const SALT_LEN: usize = 8;

/// AES-256 key length in bytes.
const KEY_LEN: usize = 32;

/// AES block / CBC IV length in bytes.
const IV_LEN: usize = 16;

/// Minimum number of random bytes drawn for any random hex request.
const MIN_RANDOM_BYTES: usize = 4;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the digest and cipher primitives used by the gate.
pub trait CryptoProvider: Send + Sync {
    /// Return `length` lowercase hex characters. At least four bytes of
    /// entropy are drawn even when fewer characters are requested.
    fn random_hex(&self, length: usize) -> String;

    /// Hex-encoded one-way digest of `input`.
    fn digest(&self, input: &str) -> String;

    /// `digest(input + salt)`.
    fn salted_digest(&self, input: &str, salt: &str) -> String {
        let mut salted = String::with_capacity(input.len() + salt.len());
        salted.push_str(input);
        salted.push_str(salt);
        self.digest(&salted)
    }

    /// Encrypt `plaintext` under `passphrase`. The output embeds its own salt,
    /// so two calls with the same inputs produce different ciphertexts.
    fn encrypt(&self, plaintext: &str, passphrase: &str) -> String;

    /// Decrypt, reporting why a ciphertext could not be opened.
    fn try_decrypt(&self, ciphertext: &str, passphrase: &str) -> Result<String, CryptoError>;

    /// Decrypt, returning an empty string on any failure.
    /// Callers must treat an empty result as failure, not as empty content.
    fn decrypt(&self, ciphertext: &str, passphrase: &str) -> String {
        match self.try_decrypt(ciphertext, passphrase) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::debug!(reason = %e, "Decryption yielded no plaintext");
                String::new()
            }
        }
    }
}

// ─── Implementation ──────────────────────────────────────────────────────────

/// SHA-1 digests and OpenSSL-compatible passphrase AES.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSslCompatCipher;

impl OpenSslCompatCipher {
    pub fn new() -> Self {
        Self
    }

    /// EVP_BytesToKey with MD5 and a single iteration:
    /// D_i = MD5(D_{i-1} || passphrase || salt), concatenated until key + IV
    /// bytes are available.
    fn derive_key_iv(passphrase: &[u8], salt: &[u8]) -> Zeroizing<[u8; KEY_LEN + IV_LEN]> {
        let mut material = Zeroizing::new([0u8; KEY_LEN + IV_LEN]);
        let mut previous: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::new());
        let mut filled = 0;

        while filled < material.len() {
            let mut context = md5::Context::new();
            context.consume(previous.as_slice());
            context.consume(passphrase);
            context.consume(salt);
            let block = context.compute().0;

            let take = (material.len() - filled).min(block.len());
            material[filled..filled + take].copy_from_slice(&block[..take]);
            filled += take;
            previous = Zeroizing::new(block.to_vec());
        }

        material
    }

    fn encrypt_with_salt(plaintext: &[u8], passphrase: &str, salt: &[u8; SALT_LEN]) -> String {
        let material = Self::derive_key_iv(passphrase.as_bytes(), salt);
        let key = Key::<Aes256CbcEnc>::from_slice(&material[..KEY_LEN]);
        let iv = Iv::<Aes256CbcEnc>::from_slice(&material[KEY_LEN..]);

        let body = Aes256CbcEnc::new(key, iv).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut envelope = Vec::with_capacity(SALT_HEADER.len() + SALT_LEN + body.len());
        envelope.extend_from_slice(SALT_HEADER);
        envelope.extend_from_slice(salt);
        envelope.extend_from_slice(&body);
        STANDARD.encode(envelope)
    }
}

impl CryptoProvider for OpenSslCompatCipher {
    fn random_hex(&self, length: usize) -> String {
        let mut bytes = vec![0u8; length.max(MIN_RANDOM_BYTES)];
        rand::rng().fill_bytes(&mut bytes);

        let mut encoded = hex::encode(bytes);
        encoded.truncate(length);
        encoded
    }

    fn digest(&self, input: &str) -> String {
        hex::encode(Sha1::digest(input.as_bytes()))
    }

    fn encrypt(&self, plaintext: &str, passphrase: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt);
        Self::encrypt_with_salt(plaintext.as_bytes(), passphrase, &salt)
    }

    fn try_decrypt(&self, ciphertext: &str, passphrase: &str) -> Result<String, CryptoError> {
        let envelope = STANDARD.decode(ciphertext.trim())?;

        let header_len = SALT_HEADER.len() + SALT_LEN;
        if envelope.len() < header_len || &envelope[..SALT_HEADER.len()] != SALT_HEADER {
            return Err(CryptoError::MissingHeader);
        }

        let salt = &envelope[SALT_HEADER.len()..header_len];
        let body = &envelope[header_len..];
        if body.is_empty() || body.len() % IV_LEN != 0 {
            return Err(CryptoError::InvalidLength(body.len()));
        }

        let material = Self::derive_key_iv(passphrase.as_bytes(), salt);
        let key = Key::<Aes256CbcDec>::from_slice(&material[..KEY_LEN]);
        let iv = Iv::<Aes256CbcDec>::from_slice(&material[KEY_LEN..]);

        let plaintext = Aes256CbcDec::new(key, iv)
            .decrypt_padded_vec_mut::<Pkcs7>(body)
            .map_err(|_| CryptoError::BadPadding)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
