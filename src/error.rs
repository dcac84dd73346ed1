// Vaultgate — Top-level error types
//
// `AccessError` is the denial taxonomy. Every variant reaches the client as
// the same "Access Denied" response; the distinctions exist for logs and
// tests. `GateError` aggregates denials with the fatal failures (storage,
// configuration) at the application boundary.

use thiserror::Error;

use crate::vault::VaultError;

/// Reasons a request is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("rate limited")]
    RateLimited,

    #[error("invalid target/key pair")]
    InvalidCredentials,

    #[error("no active key session")]
    NoActiveSession,

    #[error("target does not match the open session")]
    SessionMismatch,

    #[error("key session expired or already consumed")]
    SessionExpiredOrConsumed,

    #[error("vault entry decrypted to nothing")]
    DecryptionFailed,

    #[error("vault entry missing for a validated key")]
    NotFound,
}

/// Top-level error type for all Vaultgate operations.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Access denied: {0}")]
    Denied(#[from] AccessError),

    #[error("Vault error: {0}")]
    Vault(VaultError),

    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl GateError {
    /// Whether this error is an access denial rather than a fault.
    pub fn is_denial(&self) -> bool {
        matches!(self, GateError::Denied(_))
    }
}

/// Missing and undecryptable entries are access failures; unreadable storage
/// stays fatal.
impl From<VaultError> for GateError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::NotFound(_) => GateError::Denied(AccessError::NotFound),
            VaultError::DecryptionFailed => GateError::Denied(AccessError::DecryptionFailed),
            io @ VaultError::Io { .. } => GateError::Vault(io),
        }
    }
}

pub type Result<T> = std::result::Result<T, GateError>;

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_not_found_becomes_denial() {
        let err: GateError = VaultError::NotFound("abc".to_string()).into();
        assert!(matches!(err, GateError::Denied(AccessError::NotFound)));
        assert!(err.is_denial());
    }

    #[test]
    fn test_vault_decryption_failure_becomes_denial() {
        let err: GateError = VaultError::DecryptionFailed.into();
        assert!(matches!(err, GateError::Denied(AccessError::DecryptionFailed)));
    }

    #[test]
    fn test_vault_io_stays_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: GateError = VaultError::Io {
            path: "/vault".into(),
            source: io,
        }
        .into();
        assert!(matches!(err, GateError::Vault(VaultError::Io { .. })));
        assert!(!err.is_denial());
    }
}
