// Vaultgate — CLI Command Handlers
//
// Each function handles one CLI subcommand. `serve` resolves configuration
// and hands over to the HTTP server; the others are one-shot utilities for
// provisioning and inspecting vault entries.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::config::GateConfig;
use crate::crypto::{CryptoProvider, OpenSslCompatCipher};
use crate::error::GateError;
use crate::gateway::GateServer;
use crate::vault::{DirectoryVault, VaultStore};

use super::Commands;

/// Execute the parsed CLI command.
pub async fn execute(command: Commands) -> Result<(), GateError> {
    match command {
        Commands::Serve {
            config,
            bind,
            vault_dir,
        } => cmd_serve(config, bind, vault_dir).await,
        Commands::Seal {
            target,
            key,
            input,
            data,
            config,
            vault_dir,
        } => cmd_seal(
            target,
            Zeroizing::new(key),
            input,
            data,
            config.as_deref(),
            vault_dir,
        ),
        Commands::Hash { input, salt } => {
            cmd_hash(&input, salt.as_deref());
            Ok(())
        }
        Commands::RandomHex { length } => {
            cmd_random_hex(length);
            Ok(())
        }
    }
}

/// Resolve the effective configuration: file (or defaults), then flags.
fn resolve_config(
    path: Option<&Path>,
    bind: Option<SocketAddr>,
    vault_dir: Option<PathBuf>,
) -> Result<GateConfig, GateError> {
    let mut config = GateConfig::load_or_default(path)?;
    if let Some(bind) = bind {
        config.bind = bind;
    }
    if let Some(vault_dir) = vault_dir {
        config.vault_dir = vault_dir;
    }
    Ok(config)
}

// ─── Serve ───────────────────────────────────────────────────────────────────

async fn cmd_serve(
    config_path: Option<PathBuf>,
    bind: Option<SocketAddr>,
    vault_dir: Option<PathBuf>,
) -> Result<(), GateError> {
    let config = resolve_config(config_path.as_deref(), bind, vault_dir)?;
    GateServer::new(config).run().await
}

// ─── Provisioning ────────────────────────────────────────────────────────────

fn cmd_seal(
    target: String,
    key: Zeroizing<String>,
    input: Option<PathBuf>,
    data: Option<String>,
    config_path: Option<&Path>,
    vault_dir: Option<PathBuf>,
) -> Result<(), GateError> {
    if target.is_empty() || key.is_empty() {
        return Err(GateError::Other(
            "target and key must not be empty".to_string(),
        ));
    }

    let payload = match (input, data) {
        (Some(path), _) => Zeroizing::new(std::fs::read_to_string(path)?),
        (None, Some(text)) => Zeroizing::new(text),
        (None, None) => {
            return Err(GateError::Other(
                "either --input or --data is required".to_string(),
            ))
        }
    };
    if payload.is_empty() {
        return Err(GateError::Other(
            "refusing to seal an empty payload; it could never be released".to_string(),
        ));
    }

    let config = resolve_config(config_path, None, vault_dir)?;
    let crypto: Arc<dyn CryptoProvider> = Arc::new(OpenSslCompatCipher::new());
    let vault = DirectoryVault::new(config.vault_dir, crypto);
    let path = vault.seal(&target, &key, &payload)?;

    println!("✓ Vault entry sealed");
    println!("  Target: {}", target);
    println!("  Entry:  {}", path.display());
    Ok(())
}

// ─── Utilities ───────────────────────────────────────────────────────────────

fn cmd_hash(input: &str, salt: Option<&str>) {
    let crypto = OpenSslCompatCipher::new();
    let digest = match salt {
        Some(salt) => crypto.salted_digest(input, salt),
        None => crypto.digest(input),
    };
    println!("{}", digest);
}

fn cmd_random_hex(length: usize) {
    println!("{}", OpenSslCompatCipher::new().random_hex(length));
}

// ─── Tests ───────────────────────────────────────────────────────────────────
