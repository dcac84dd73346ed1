// Vaultgate — Key Session Module
//
// A single global slot holding at most one ephemeral key session. The key
// can be taken exactly once, and the session expires on its own when its
// TTL runs out.

mod manager;

pub use manager::{
    parse_ttl, KeySessionManager, SessionHandle, SessionId, SessionState, DEFAULT_TTL, MAX_TTL,
};
