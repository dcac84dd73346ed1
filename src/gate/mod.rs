// Vaultgate — Access Gate Module
//
// Per-source sliding-window rate limiting with a self-healing deny list.

mod limiter;

pub use limiter::{AccessGate, GatePolicy};
