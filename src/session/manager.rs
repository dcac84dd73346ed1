// Vaultgate — Key Session Manager
//
// Lifecycle: Empty → Active → {Consumed | Expired} → Empty.
//
// `open` always replaces whatever is in the slot. `take` checks and clears
// in one step, so a key is handed out at most once. `expire` is the timer
// entry point and only acts on the session it was scheduled for, which makes
// stale timers from replaced sessions harmless. Lazy checks against
// `expires_at` keep the guarantees even if a timer never fires.
//
// SECURITY: the key lives in a `Zeroizing` buffer owned by the slot and is
// wiped whenever the session is consumed, expired, or replaced. It is never
// included in Debug output or log messages.

use std::fmt;
use std::time::{Duration, Instant};

use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::AccessError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// TTL applied when the caller gives none, or gives an unusable value.
pub const DEFAULT_TTL: Duration = Duration::from_millis(60_000);

/// Upper bound on any session TTL (24 hours).
pub const MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// ─── Types ───────────────────────────────────────────────────────────────────

/// Identity of one opened session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What `open` hands back: enough to schedule the expiry timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: SessionId,
    pub target: String,
    pub ttl: Duration,
    pub expires_at: Instant,
}

/// Observable state of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session.
    Empty,
    /// A session whose key can still be taken.
    Active,
    /// A session whose key was taken or whose TTL ran out; holds no key.
    Spent,
}

struct KeySession {
    id: SessionId,
    target: String,
    key: Option<Zeroizing<String>>,
    expires_at: Instant,
}

/// Custom Debug implementation that never reveals the key.
impl fmt::Debug for KeySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySession")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ─── Manager ─────────────────────────────────────────────────────────────────

/// Owner of the single key session slot.
#[derive(Debug)]
pub struct KeySessionManager {
    slot: Option<KeySession>,
    default_ttl: Duration,
}

impl Default for KeySessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl KeySessionManager {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            slot: None,
            default_ttl: default_ttl.min(MAX_TTL),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Open a new session, replacing (and wiping) any existing one.
    /// `ttl` falls back to the default when absent and is capped at `MAX_TTL`.
    pub fn open(
        &mut self,
        target: impl Into<String>,
        key: Zeroizing<String>,
        ttl: Option<Duration>,
        now: Instant,
    ) -> SessionHandle {
        let ttl = ttl.unwrap_or(self.default_ttl).min(MAX_TTL);
        let handle = SessionHandle {
            id: SessionId::new(),
            target: target.into(),
            ttl,
            expires_at: now + ttl,
        };

        let replaced = self.slot.replace(KeySession {
            id: handle.id,
            target: handle.target.clone(),
            key: Some(key),
            expires_at: handle.expires_at,
        });

        if let Some(previous) = replaced {
            tracing::debug!(session = %previous.id, "Previous key session replaced");
        }
        tracing::info!(
            session = %handle.id,
            vault_target = %handle.target,
            ttl_ms = ttl.as_millis() as u64,
            "Key session opened"
        );

        handle
    }

    /// Take the key for `target`, consuming the session.
    ///
    /// Succeeds at most once per session. A target mismatch leaves the
    /// session untouched.
    pub fn take(&mut self, target: &str, now: Instant) -> Result<Zeroizing<String>, AccessError> {
        let Some(session) = self.slot.as_mut() else {
            return Err(AccessError::NoActiveSession);
        };

        if session.key.is_none() {
            return Err(AccessError::SessionExpiredOrConsumed);
        }

        if now >= session.expires_at {
            let id = session.id;
            self.slot = None;
            tracing::info!(session = %id, "Key session expired before it was taken");
            return Err(AccessError::SessionExpiredOrConsumed);
        }

        if session.target != target {
            return Err(AccessError::SessionMismatch);
        }

        let Some(key) = session.key.take() else {
            return Err(AccessError::SessionExpiredOrConsumed);
        };
        tracing::info!(session = %session.id, "Key session consumed");
        Ok(key)
    }

    /// Timer entry point: clear the slot if it still holds session `id`.
    /// Returns true if a live key was wiped.
    pub fn expire(&mut self, id: SessionId) -> bool {
        let current = self.slot.as_ref().is_some_and(|session| session.id == id);
        if !current {
            return false;
        }

        let was_live = self
            .slot
            .take()
            .is_some_and(|session| session.key.is_some());
        if was_live {
            tracing::info!(session = %id, "Key session expired");
        }
        was_live
    }

    /// Clear the slot if its session is past `expires_at`.
    /// Returns true if a live key was wiped.
    pub fn sweep(&mut self, now: Instant) -> bool {
        match self.slot.as_ref() {
            Some(session) if now >= session.expires_at => {
                let id = session.id;
                self.expire(id)
            }
            _ => false,
        }
    }

    pub fn state(&self, now: Instant) -> SessionState {
        match &self.slot {
            None => SessionState::Empty,
            Some(session) if session.key.is_none() || now >= session.expires_at => {
                SessionState::Spent
            }
            Some(_) => SessionState::Active,
        }
    }
}

/// Interpret a raw TTL parameter in milliseconds.
/// Anything that is not a non-negative integer yields `default`.
pub fn parse_ttl(raw: Option<&str>, default: Duration) -> Duration {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn key(value: &str) -> Zeroizing<String> {
        Zeroizing::new(value.to_string())
    }

    #[test]
    fn test_take_succeeds_exactly_once() {
        let mut sessions = KeySessionManager::default();
        let t0 = Instant::now();
        sessions.open("alpha", key("swordfish"), Some(ms(5_000)), t0);

        let taken = sessions.take("alpha", t0 + ms(1_000)).unwrap();
        assert_eq!(taken.as_str(), "swordfish");

        assert_eq!(
            sessions.take("alpha", t0 + ms(1_001)),
            Err(AccessError::SessionExpiredOrConsumed)
        );
    }

    #[test]
    fn test_session_expires_without_take() {
        let mut sessions = KeySessionManager::default();
        let t0 = Instant::now();
        sessions.open("alpha", key("swordfish"), Some(ms(100)), t0);

        assert!(sessions.take("alpha", t0 + ms(200)).is_err());
        assert_eq!(sessions.state(t0 + ms(200)), SessionState::Empty);
    }

    #[test]
    fn test_take_at_exact_expiry_fails() {
        let mut sessions = KeySessionManager::default();
        let t0 = Instant::now();
        sessions.open("alpha", key("swordfish"), Some(ms(100)), t0);

        assert_eq!(
            sessions.take("alpha", t0 + ms(100)),
            Err(AccessError::SessionExpiredOrConsumed)
        );
    }

    #[test]
    fn test_open_replaces_previous_session() {
        let mut sessions = KeySessionManager::default();
        let t0 = Instant::now();
        sessions.open("first", key("k1"), Some(ms(10_000)), t0);
        sessions.open("second", key("k2"), Some(ms(10_000)), t0);

        assert_eq!(
            sessions.take("first", t0 + ms(10)),
            Err(AccessError::SessionMismatch)
        );
        assert_eq!(sessions.take("second", t0 + ms(10)).unwrap().as_str(), "k2");
    }

    #[test]
    fn test_mismatch_does_not_consume() {
        let mut sessions = KeySessionManager::default();
        let t0 = Instant::now();
        sessions.open("alpha", key("swordfish"), None, t0);

        assert_eq!(
            sessions.take("beta", t0 + ms(10)),
            Err(AccessError::SessionMismatch)
        );
        assert_eq!(sessions.state(t0 + ms(10)), SessionState::Active);
        assert!(sessions.take("alpha", t0 + ms(20)).is_ok());
    }

    #[test]
    fn test_take_without_session() {
        let mut sessions = KeySessionManager::default();
        assert_eq!(
            sessions.take("alpha", Instant::now()),
            Err(AccessError::NoActiveSession)
        );
    }

    #[test]
    fn test_expire_clears_matching_session() {
        let mut sessions = KeySessionManager::default();
        let t0 = Instant::now();
        let handle = sessions.open("alpha", key("swordfish"), None, t0);

        assert!(sessions.expire(handle.id));
        assert_eq!(sessions.state(t0), SessionState::Empty);
        assert_eq!(
            sessions.take("alpha", t0),
            Err(AccessError::NoActiveSession)
        );
    }

    #[test]
    fn test_stale_expiry_is_noop() {
        let mut sessions = KeySessionManager::default();
        let t0 = Instant::now();
        let stale = sessions.open("first", key("k1"), None, t0);
        sessions.open("second", key("k2"), None, t0);

        assert!(!sessions.expire(stale.id));
        assert_eq!(sessions.state(t0), SessionState::Active);
        assert!(sessions.take("second", t0).is_ok());
    }

    #[test]
    fn test_expiry_after_consumption_is_noop() {
        let mut sessions = KeySessionManager::default();
        let t0 = Instant::now();
        let handle = sessions.open("alpha", key("swordfish"), None, t0);

        sessions.take("alpha", t0).unwrap();
        assert_eq!(sessions.state(t0), SessionState::Spent);
        assert!(!sessions.expire(handle.id), "no live key left to wipe");
        assert_eq!(sessions.state(t0), SessionState::Empty);
    }

    #[test]
    fn test_sweep_only_clears_expired_sessions() {
        let mut sessions = KeySessionManager::default();
        let t0 = Instant::now();
        sessions.open("alpha", key("swordfish"), Some(ms(1_000)), t0);

        assert!(!sessions.sweep(t0 + ms(500)));
        assert_eq!(sessions.state(t0 + ms(500)), SessionState::Active);

        assert!(sessions.sweep(t0 + ms(1_000)));
        assert_eq!(sessions.state(t0 + ms(1_000)), SessionState::Empty);
    }

    #[test]
    fn test_default_and_max_ttl() {
        let mut sessions = KeySessionManager::default();
        let t0 = Instant::now();

        let handle = sessions.open("alpha", key("k"), None, t0);
        assert_eq!(handle.ttl, DEFAULT_TTL);
        assert_eq!(handle.expires_at, t0 + DEFAULT_TTL);

        let handle = sessions.open("alpha", key("k"), Some(Duration::from_secs(u32::MAX as u64)), t0);
        assert_eq!(handle.ttl, MAX_TTL);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let mut sessions = KeySessionManager::default();
        let t0 = Instant::now();
        sessions.open("alpha", key("k"), Some(Duration::ZERO), t0);
        assert!(sessions.take("alpha", t0).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let mut sessions = KeySessionManager::default();
        sessions.open("alpha", key("super-secret-key"), None, Instant::now());
        let debug = format!("{:?}", sessions);
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_parse_ttl() {
        let default = ms(60_000);
        assert_eq!(parse_ttl(None, default), default);
        assert_eq!(parse_ttl(Some("5000"), default), ms(5_000));
        assert_eq!(parse_ttl(Some(" 250 "), default), ms(250));
        assert_eq!(parse_ttl(Some("0"), default), Duration::ZERO);
        assert_eq!(parse_ttl(Some("-1"), default), default);
        assert_eq!(parse_ttl(Some("abc"), default), default);
        assert_eq!(parse_ttl(Some("1.5"), default), default);
        assert_eq!(parse_ttl(Some(""), default), default);
    }
}
