//! Registry usage statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time statistics for a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of registered entries.
    pub registered: usize,
    /// Entries that reached the materialized state.
    pub materialized: u64,
    /// Entries that reached the failed state.
    pub failed: u64,
    /// Calls to `get` on registered entries.
    pub lookups: u64,
    /// Lookups answered from an already terminal entry.
    pub hits: u64,
    /// Producer invocations. Never exceeds `registered`.
    pub producer_invocations: u64,
}

impl RegistryStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }

    /// Entries registered but not yet accessed.
    pub fn pending(&self) -> u64 {
        (self.registered as u64).saturating_sub(self.materialized + self.failed)
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    lookups: AtomicU64,
    hits: AtomicU64,
    invocations: AtomicU64,
    materialized: AtomicU64,
    failed: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_lookup(&self, hit: bool) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_invocation(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_materialized(&self) {
        self.materialized.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, registered: usize) -> RegistryStats {
        RegistryStats {
            registered,
            materialized: self.materialized.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            producer_invocations: self.invocations.load(Ordering::Relaxed),
        }
    }
}
