//! Single-slot pool for multiplexed workers
//!
//! Tasks on a multiplexed worker may suspend mid-lease and resume on another
//! worker, so bump state cannot live with the worker. The pool only tracks
//! whether its segment is taken; the winning lease keeps its own cursor.

use std::alloc::Layout;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::trace;

use super::region::{OwnerRegion, RecycledSegment, RegionLifetime};
use crate::error::MemoryResult;
use crate::lease::{CarrierCursor, Lease, SlicingArena};
use crate::scope::ScopedArena;
use crate::stats::StatsCounters;

const AVAILABLE: u8 = 0;
const TAKEN: u8 = 1;

pub(crate) struct ExclusivePool {
    region: Arc<OwnerRegion>,
    segment: RecycledSegment,
    state: AtomicU8,
    stats: Option<Arc<StatsCounters>>,
}

impl ExclusivePool {
    pub(crate) fn new(layout: Layout, stats: Option<Arc<StatsCounters>>) -> MemoryResult<Arc<Self>> {
        let region = OwnerRegion::allocate(layout, RegionLifetime::Automatic)?;
        let segment = region.recycled_segment()?;
        Ok(Arc::new(Self {
            region,
            segment,
            state: AtomicU8::new(AVAILABLE),
            stats,
        }))
    }

    /// Hands the segment to the caller if free, a plain arena otherwise
    pub(crate) fn take(self: &Arc<Self>) -> Lease {
        if self.try_acquire() {
            Lease::carrier(SlicingArena::new(
                Arc::clone(&self.region),
                ScopedArena::confined(),
                self.segment,
                CarrierCursor::new(Arc::clone(self)),
                self.stats.clone(),
            ))
        } else {
            trace!(segment = self.segment.address(), "recycled segment busy, handing out fallback lease");
            Lease::fallback(ScopedArena::confined())
        }
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.state
            .compare_exchange(AVAILABLE, TAKEN, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Makes the segment available again; idempotent
    #[inline]
    pub(crate) fn release(&self) {
        self.state.store(AVAILABLE, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn is_taken(&self) -> bool {
        self.state.load(Ordering::Acquire) == TAKEN
    }

    pub(crate) fn close(&self) {
        self.region.close();
    }
}
