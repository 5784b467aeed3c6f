//! Stacking pool for plain workers
//!
//! A plain worker runs one logical task at a time, so leases never migrate
//! mid-flight. Any number of leases may be open at once; they share one bump
//! pointer that only rewinds once every lease has closed. Relaxed atomics
//! stand in for plain fields: the thread confinement of every shared lease
//! keeps all accesses on one thread.

use std::alloc::Layout;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::region::{OwnerRegion, RecycledSegment, RegionLifetime};
use crate::error::MemoryResult;
use crate::lease::{Lease, SharedCursor, SlicingArena};
use crate::scope::ScopedArena;
use crate::stats::StatsCounters;

pub(crate) struct SharedPool {
    region: Arc<OwnerRegion>,
    segment: RecycledSegment,
    sp: AtomicUsize,
    open_leases: AtomicUsize,
    stats: Option<Arc<StatsCounters>>,
}

impl SharedPool {
    pub(crate) fn new(layout: Layout, stats: Option<Arc<StatsCounters>>) -> MemoryResult<Arc<Self>> {
        let region = OwnerRegion::allocate(layout, RegionLifetime::Closeable)?;
        let segment = region.recycled_segment()?;
        Ok(Arc::new(Self {
            region,
            segment,
            sp: AtomicUsize::new(0),
            open_leases: AtomicUsize::new(0),
            stats,
        }))
    }

    /// Opens another lease stacked on the shared bump pointer
    pub(crate) fn take(self: &Arc<Self>) -> Lease {
        let open = self.open_leases.load(Ordering::Relaxed);
        self.open_leases.store(open + 1, Ordering::Relaxed);
        Lease::shared(SlicingArena::new(
            Arc::clone(&self.region),
            ScopedArena::thread_confined(),
            self.segment,
            SharedCursor::new(Arc::clone(self)),
            self.stats.clone(),
        ))
    }

    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.sp.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_offset(&self, offset: usize) {
        self.sp.store(offset, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn open_leases(&self) -> usize {
        self.open_leases.load(Ordering::Relaxed)
    }

    /// Called once per lease after it closed; rewinds when none remain
    pub(crate) fn lease_closed(&self) {
        let open = self.open_leases.load(Ordering::Relaxed).saturating_sub(1);
        self.open_leases.store(open, Ordering::Relaxed);
        if open == 0 {
            self.sp.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn close(&self) {
        self.region.close();
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.region.is_closed()
    }
}
