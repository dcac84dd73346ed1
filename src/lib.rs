// Vaultgate — Library root
//
// Re-exports the gate, session, vault, crypto, gateway, and CLI modules.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod session;
pub mod vault;

pub use error::{AccessError, GateError, Result};
