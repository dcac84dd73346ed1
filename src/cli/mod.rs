// Vaultgate — CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: serve, seal, hash, random-hex.

mod commands;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

pub use commands::execute;

/// Vaultgate — rate-limited gate releasing vault entries through single-use key sessions.
#[derive(Parser, Debug)]
#[command(name = "vaultgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP gate.
    Serve {
        /// TOML configuration file. Defaults apply when omitted.
        #[arg(long, env = "VAULTGATE_CONFIG")]
        config: Option<PathBuf>,

        /// Address to bind, overriding the config file.
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Vault directory, overriding the config file.
        #[arg(long)]
        vault_dir: Option<PathBuf>,
    },

    /// Encrypt a payload and store it as the vault entry for a target/key pair.
    #[command(group(ArgGroup::new("payload").required(true).args(["input", "data"])))]
    Seal {
        /// The target name the entry is released for.
        #[arg(long)]
        target: String,

        /// The key that unlocks the entry.
        /// Prefer a config-managed value to avoid shell history exposure.
        #[arg(long)]
        key: String,

        /// Read the payload from this file.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Use this text as the payload.
        #[arg(long)]
        data: Option<String>,

        /// TOML configuration file naming the vault directory.
        #[arg(long, env = "VAULTGATE_CONFIG")]
        config: Option<PathBuf>,

        /// Vault directory (defaults to the configured location).
        #[arg(long)]
        vault_dir: Option<PathBuf>,
    },

    /// Print the SHA-1 digest of INPUT, or of INPUT followed by SALT.
    Hash {
        input: String,

        #[arg(long)]
        salt: Option<String>,
    },

    /// Print random lowercase hex.
    RandomHex {
        #[arg(long, default_value = "32")]
        length: usize,
    },
}

// ─── Tests ───────────────────────────────────────────────────────────────────
