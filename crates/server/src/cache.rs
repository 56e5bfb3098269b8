//! Bounded forwarding-decision cache
//!
//! Keys are lowercased hostnames; values are validated forwarding
//! decisions. moka provides the capacity bound with LRU-style eviction.
//! Time-to-live is deliberately not delegated to moka: each decision
//! carries its own `expires_at_ms` and the caller treats an expired entry
//! as a miss, so a rebuild overwrites the slot in place.

use moka::sync::Cache;
use signpost_core::ForwardDecision;
use tracing::debug;

/// Capacity-bounded cache mapping hostname to forwarding decision.
#[derive(Clone)]
pub struct ForwardingCache {
    entries: Cache<String, ForwardDecision>,
    capacity: u64,
}

impl ForwardingCache {
    /// Create a cache holding at most `capacity` decisions.
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: Cache::new(capacity),
            capacity,
        }
    }

    /// Look up a decision. Expiry is the caller's check.
    pub fn get(&self, host: &str) -> Option<ForwardDecision> {
        self.entries.get(&host.to_ascii_lowercase())
    }

    /// Insert or replace the decision for a host.
    pub fn insert(&self, host: &str, decision: ForwardDecision) {
        self.entries.insert(host.to_ascii_lowercase(), decision);
    }

    /// Drop a single host so its next lookup is a forced miss.
    pub fn invalidate(&self, host: &str) {
        let host = host.to_ascii_lowercase();
        debug!("invalidating cache entry for {}", host);
        self.entries.invalidate(&host);
    }

    /// Discard the entire store (administrative full flush).
    pub fn reset_all(&self) {
        debug!("flushing all {} cache entries", self.entries.entry_count());
        self.entries.invalidate_all();
    }

    /// Number of cached decisions.
    ///
    /// moka maintains this lazily; `run_pending_tasks` makes it accurate
    /// enough for the `/stat` snapshot.
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Configured capacity bound.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}
