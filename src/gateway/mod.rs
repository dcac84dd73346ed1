// Vaultgate — Gateway Module
//
// The HTTP face of the gate. Requests pass the secure-transport redirect and
// the access gate before reaching a route; `/open` and `/take` drive the key
// session and the vault through the shared pipeline state.

mod http;
mod pipeline;
mod source;

pub use http::{router, GateServer, HttpOptions};
pub use pipeline::{GateState, Pipeline};
pub use source::client_address;
