// Vaultgate — Sliding Window Access Gate
//
// Every inbound request is appended to its source's access history. Records
// age out once they are a full window old. A source that produces more than
// `limit` requests inside one window lands on the deny list, and comes off it
// again as soon as its recent count drops below `limit`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default sliding window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(10_000);

/// Default number of requests tolerated per source inside one window.
pub const DEFAULT_LIMIT: usize = 5;

// ─── Types ───────────────────────────────────────────────────────────────────

/// Window and limit applied by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    pub window: Duration,
    pub limit: usize,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Admission decisions for inbound requests.
#[derive(Debug, Default)]
pub struct AccessGate {
    policy: GatePolicy,
    /// Chronological request times per source, all younger than one window
    /// as of that source's last request.
    history: HashMap<IpAddr, VecDeque<Instant>>,
    denied: HashSet<IpAddr>,
}

impl AccessGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self {
            policy,
            history: HashMap::new(),
            denied: HashSet::new(),
        }
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Record a request from `source` at `now` and decide whether to admit it.
    ///
    /// Denied requests are recorded as well, so a source that keeps hammering
    /// the gate stays denied until it goes quiet. Only `source`'s own history
    /// is touched.
    pub fn admit(&mut self, source: IpAddr, now: Instant) -> bool {
        let GatePolicy { window, limit } = self.policy;

        let history = self.history.entry(source).or_default();
        history.push_back(now);
        purge(history, now, window);
        let recent = history.len();

        if self.denied.contains(&source) {
            if recent < limit {
                self.denied.remove(&source);
                tracing::info!(source = %source, recent, "Source released from deny list");
            }
        } else if recent > limit {
            let first = history[recent - (limit + 1)];
            if now.saturating_duration_since(first) < window {
                self.denied.insert(source);
                tracing::warn!(source = %source, recent, "Burst detected, source denied");
            }
        }

        !self.denied.contains(&source)
    }

    /// Whether `source` is currently on the deny list.
    pub fn is_denied(&self, source: &IpAddr) -> bool {
        self.denied.contains(source)
    }

    /// Requests from `source` still held in its history.
    pub fn recent_requests(&self, source: &IpAddr) -> usize {
        self.history.get(source).map_or(0, VecDeque::len)
    }

    /// Number of access records held across all sources.
    pub fn tracked_records(&self) -> usize {
        self.history.values().map(VecDeque::len).sum()
    }

    /// Drop records that are a full window old as of `now`, and the
    /// histories left empty. The deny list is kept.
    pub fn prune(&mut self, now: Instant) {
        let window = self.policy.window;
        self.history.retain(|_, history| {
            purge(history, now, window);
            !history.is_empty()
        });
    }
}

/// Drop records that are a full window old. Histories are chronological, so
/// expired records are always at the front.
fn purge(history: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = history.front() {
        if now.saturating_duration_since(*oldest) >= window {
            history.pop_front();
        } else {
            break;
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
