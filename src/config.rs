// Vaultgate — Configuration
//
// Settings come from an optional TOML file; every field has a default so an
// empty (or absent) file yields a working gate. CLI flags override the file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::gate::GatePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime configuration of the gate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Address the HTTP server binds to.
    pub bind: SocketAddr,
    /// Directory holding the vault entries.
    pub vault_dir: PathBuf,
    /// Sliding window length for rate limiting, in milliseconds.
    pub window_ms: u64,
    /// Requests tolerated per source within one window.
    pub limit: usize,
    /// Session TTL used when `/open` gives none, in milliseconds.
    pub default_ttl_ms: u64,
    /// Status code of every denial: 401 or 403.
    pub deny_status: u16,
    /// Redirect requests forwarded over plain HTTP to HTTPS.
    pub force_https: bool,
    /// Identify clients by the first `X-Forwarded-For` address instead of
    /// the peer address. Only enable behind a trusted proxy.
    pub trust_forwarded_for: bool,
    /// Interval of the background sweep that clears expired sessions.
    pub sweep_interval_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            vault_dir: default_vault_dir(),
            window_ms: 10_000,
            limit: 5,
            default_ttl_ms: 60_000,
            deny_status: 403,
            force_https: true,
            trust_forwarded_for: false,
            sweep_interval_ms: 1_000,
        }
    }
}

/// Default vault location: `<data dir>/vaultgate/vault`.
fn default_vault_dir() -> PathBuf {
    let base = dirs_next::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("vaultgate").join("vault")
}

impl GateConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: GateConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&raw)?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::Invalid("limit must be at least 1".to_string()));
        }
        if self.window_ms == 0 {
            return Err(ConfigError::Invalid("window_ms must be positive".to_string()));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sweep_interval_ms must be positive".to_string(),
            ));
        }
        if !matches!(self.deny_status, 401 | 403) {
            return Err(ConfigError::Invalid(format!(
                "deny_status must be 401 or 403, got {}",
                self.deny_status
            )));
        }
        Ok(())
    }

    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy {
            window: Duration::from_millis(self.window_ms),
            limit: self.limit,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gate_policy(), GatePolicy::default());
        assert_eq!(config.default_ttl(), Duration::from_millis(60_000));
        assert!(config.vault_dir.ends_with("vaultgate/vault"));
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = GateConfig::from_toml("").unwrap();
        assert_eq!(config, GateConfig::default());
    }

    #[test]
    fn test_partial_document_overrides_fields() {
        let config = GateConfig::from_toml(
            r#"
            bind = "127.0.0.1:8443"
            vault_dir = "/srv/vault"
            limit = 10
            deny_status = 401
            force_https = false
            "#,
        )
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:8443".parse().unwrap());
        assert_eq!(config.vault_dir, PathBuf::from("/srv/vault"));
        assert_eq!(config.limit, 10);
        assert_eq!(config.deny_status, 401);
        assert!(!config.force_https);
        assert_eq!(config.window_ms, 10_000);
    }

    #[test]
    fn test_invalid_deny_status_is_rejected() {
        let result = GateConfig::from_toml("deny_status = 404");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let result = GateConfig::from_toml("limit = 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = GateConfig::from_toml("rate = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vaultgate.toml");
        std::fs::write(&path, "window_ms = 2000\n").unwrap();

        let config = GateConfig::load(&path).unwrap();
        assert_eq!(config.window_ms, 2_000);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = GateConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_or_default_without_path() {
        assert_eq!(GateConfig::load_or_default(None).unwrap(), GateConfig::default());
    }
}
