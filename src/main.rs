// Vaultgate — Application Entry Point
//
// Parses CLI arguments, initializes structured logging (with a filter that
// never emits key material or vault contents), and dispatches to the command
// handler.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vaultgate::cli::{execute, Cli};

#[tokio::main]
async fn main() {
    // RUST_LOG=vaultgate=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vaultgate=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = execute(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
