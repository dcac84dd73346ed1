// Vaultgate — Request Pipeline
//
// Owns the process-wide gate state (access log, deny list, session slot) and
// sequences each request through it. All mutation happens inside a single
// lock acquisition per step, and nothing awaits while the lock is held, so
// admit / open / take / expire never interleave mid-step. Vault reads run
// outside the lock.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use zeroize::Zeroizing;

use crate::config::GateConfig;
use crate::crypto::CryptoProvider;
use crate::error::{AccessError, GateError};
use crate::gate::AccessGate;
use crate::session::{parse_ttl, KeySessionManager, SessionHandle, SessionState};
use crate::vault::VaultStore;

/// Shared mutable state of the gate.
#[derive(Debug)]
pub struct GateState {
    pub gate: AccessGate,
    pub sessions: KeySessionManager,
    /// Expiry timer of the session currently in the slot.
    expiry_timer: Option<AbortHandle>,
}

impl GateState {
    pub fn new(gate: AccessGate, sessions: KeySessionManager) -> Self {
        Self {
            gate,
            sessions,
            expiry_timer: None,
        }
    }
}

/// Orchestrates AccessGate → route → KeySessionManager / VaultStore.
pub struct Pipeline {
    state: Arc<Mutex<GateState>>,
    vault: Arc<dyn VaultStore>,
    crypto: Arc<dyn CryptoProvider>,
}

impl Pipeline {
    pub fn new(
        config: &GateConfig,
        vault: Arc<dyn VaultStore>,
        crypto: Arc<dyn CryptoProvider>,
    ) -> Self {
        let state = GateState::new(
            AccessGate::new(config.gate_policy()),
            KeySessionManager::new(config.default_ttl()),
        );
        Self {
            state: Arc::new(Mutex::new(state)),
            vault,
            crypto,
        }
    }

    pub fn crypto(&self) -> &dyn CryptoProvider {
        self.crypto.as_ref()
    }

    /// Run the access gate for a request from `source`.
    pub fn admit(&self, source: IpAddr, now: Instant) -> Result<(), AccessError> {
        if self.state.lock().gate.admit(source, now) {
            Ok(())
        } else {
            Err(AccessError::RateLimited)
        }
    }

    /// Validate `(target, key)` against the vault and open a key session.
    ///
    /// Unreadable vault storage is returned as a fatal error, not a denial.
    pub fn open_session(
        &self,
        target: Option<&str>,
        key: Option<Zeroizing<String>>,
        ttl: Option<&str>,
        now: Instant,
    ) -> Result<SessionHandle, GateError> {
        let (Some(target), Some(key)) = (non_empty(target), key.filter(|k| !k.is_empty())) else {
            return Err(AccessError::InvalidCredentials.into());
        };

        if !self.vault.is_valid_key(target, &key)? {
            tracing::info!(vault_target = %target, "Rejected key for target");
            return Err(AccessError::InvalidCredentials.into());
        }

        let mut state = self.state.lock();
        let ttl = parse_ttl(ttl, state.sessions.default_ttl());
        let handle = state.sessions.open(target, key, Some(ttl), now);
        let timer = self.schedule_expiry(&handle);
        if let Some(previous) = std::mem::replace(&mut state.expiry_timer, timer) {
            previous.abort();
        }

        Ok(handle)
    }

    /// Consume the open session for `target` and return the decrypted entry.
    pub fn take_session(
        &self,
        target: Option<&str>,
        now: Instant,
    ) -> Result<Zeroizing<String>, GateError> {
        let Some(target) = non_empty(target) else {
            return Err(AccessError::NoActiveSession.into());
        };

        let key = self.state.lock().sessions.take(target, now)?;
        let plaintext = self.vault.retrieve(target, &key)?;
        Ok(plaintext)
    }

    /// Clear the session slot if its TTL has run out and drop idle access
    /// histories. Returns true if a live key was wiped.
    pub fn sweep(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        state.gate.prune(now);
        state.sessions.sweep(now)
    }

    pub fn session_state(&self, now: Instant) -> SessionState {
        self.state.lock().sessions.state(now)
    }

    /// Periodically sweep expired sessions, so expiry holds even if a timer
    /// task is lost.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                pipeline.sweep(Instant::now());
            }
        })
    }

    /// Spawn the expiry timer for a freshly opened session. Outside a tokio
    /// runtime no timer is scheduled and expiry relies on the lazy checks.
    fn schedule_expiry(&self, handle: &SessionHandle) -> Option<AbortHandle> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(session = %handle.id, "No runtime; session expiry is lazy");
            return None;
        };

        let state = Arc::clone(&self.state);
        let id = handle.id;
        let ttl = handle.ttl;
        let task = runtime.spawn(async move {
            tokio::time::sleep(ttl).await;
            state.lock().sessions.expire(id);
        });
        Some(task.abort_handle())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
