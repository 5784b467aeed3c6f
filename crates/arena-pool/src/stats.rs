//! Usage counters shared by every worker pool of one [`ArenaPool`](crate::ArenaPool)

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated on the hot path
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    leases_taken: AtomicU64,
    pooled_leases: AtomicU64,
    sliced_allocations: AtomicU64,
    spilled_allocations: AtomicU64,
}

impl StatsCounters {
    #[inline]
    pub(crate) fn record_lease(&self, pooled: bool) {
        self.leases_taken.fetch_add(1, Ordering::Relaxed);
        if pooled {
            self.pooled_leases.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_slice(&self) {
        self.sliced_allocations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_spill(&self) {
        self.spilled_allocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        let leases_taken = self.leases_taken.load(Ordering::Relaxed);
        let pooled_leases = self.pooled_leases.load(Ordering::Relaxed);
        PoolStats {
            leases_taken,
            pooled_leases,
            fallback_leases: leases_taken.saturating_sub(pooled_leases),
            sliced_allocations: self.sliced_allocations.load(Ordering::Relaxed),
            spilled_allocations: self.spilled_allocations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of pool usage
///
/// All zeros when statistics tracking is disabled in the config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Leases handed out by `take()`
    pub leases_taken: u64,
    /// Leases backed by a worker's recycled segment
    pub pooled_leases: u64,
    /// Leases that fell back to plain allocation
    pub fallback_leases: u64,
    /// Allocations served from a recycled segment
    pub sliced_allocations: u64,
    /// Allocations on pooled leases that did not fit and were delegated
    pub spilled_allocations: u64,
}

impl PoolStats {
    /// Fraction of leases that were pooled, in `0.0..=1.0`
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        if self.leases_taken == 0 {
            return 0.0;
        }
        self.pooled_leases as f64 / self.leases_taken as f64
    }
}
