//! Bump-slicing arena over a recycled segment

use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use super::cursor::{CarrierCursor, SharedCursor, SliceCursor};
use super::keep_alive::KeepAlive;
use crate::error::MemoryResult;
use crate::pool::{OwnerRegion, RecycledSegment};
use crate::scope::{Arena, MemoryScope, ScopedArena, Segment};
use crate::stats::StatsCounters;
use crate::utils::{check_size_and_align, checked_align_up};

/// Pooled lease over a segment won from an exclusive pool
pub(crate) type CarrierSlicingArena = SlicingArena<CarrierCursor>;

/// Pooled lease stacked on a shared pool's bump pointer
pub(crate) type SharedSlicingArena = SlicingArena<SharedCursor>;

/// Slices allocations off a recycled segment, spilling to a plain arena
///
/// The wrapped [`ScopedArena`] provides the scope every slice is bound to and
/// serves requests that do not fit the remaining space.
pub(crate) struct SlicingArena<C: SliceCursor> {
    region: Arc<OwnerRegion>,
    delegate: ScopedArena,
    segment: RecycledSegment,
    cursor: C,
    keep_alive_registered: bool,
    stats: Option<Arc<StatsCounters>>,
}

impl<C: SliceCursor> SlicingArena<C> {
    pub(crate) fn new(
        region: Arc<OwnerRegion>,
        delegate: ScopedArena,
        segment: RecycledSegment,
        cursor: C,
        stats: Option<Arc<StatsCounters>>,
    ) -> Self {
        Self {
            region,
            delegate,
            segment,
            cursor,
            keep_alive_registered: false,
            stats,
        }
    }

    /// Offset into the segment where `size` bytes aligned to `align` would start
    #[inline]
    fn fit(&self, size: usize, align: usize) -> Option<usize> {
        if !align.is_power_of_two() {
            return None;
        }
        let base = self.segment.address();
        let aligned = checked_align_up(base.checked_add(self.cursor.offset())?, align)?;
        let start = aligned - base;
        let end = start.checked_add(size)?;
        (end <= self.segment.byte_size()).then_some(start)
    }

    fn ensure_keep_alive(&mut self) -> MemoryResult<()> {
        if !self.keep_alive_registered {
            let anchor = KeepAlive::new(Arc::clone(&self.region));
            self.delegate.scope().add_close_action(anchor.into_close_action())?;
            self.keep_alive_registered = true;
        }
        Ok(())
    }

    fn allocate_inner(&mut self, size: usize, align: usize, zero: bool) -> MemoryResult<Segment> {
        self.delegate.scope().check_valid_state("allocate")?;

        let Some(start) = self.fit(size, align) else {
            trace!(size, align, offset = self.cursor.offset(), "request does not fit recycled segment");
            if let Some(stats) = &self.stats {
                stats.record_spill();
            }
            // Fresh delegate blocks are zeroed either way.
            return self.delegate.allocate_no_init(size, align);
        };

        check_size_and_align(size, align)?;
        self.ensure_keep_alive()?;
        self.cursor.set_offset(start + size);
        if let Some(stats) = &self.stats {
            stats.record_slice();
        }

        // SAFETY: `fit` keeps the range inside the segment; the keep-alive
        // close action holds the region for as long as the scope lives; the
        // range lies past every slice still visible through an open scope
        // (exclusive ownership of the segment, or a bump pointer that only
        // rewinds once all stacked leases closed).
        let slice = unsafe { self.segment.reinterpret(start, size, self.delegate.scope().clone()) };
        if zero {
            slice.fill(0)?;
        }
        Ok(slice)
    }
}

impl<C: SliceCursor> Arena for SlicingArena<C> {
    fn scope(&self) -> &MemoryScope {
        self.delegate.scope()
    }

    fn allocate_no_init(&mut self, size: usize, align: usize) -> MemoryResult<Segment> {
        self.allocate_inner(size, align, false)
    }

    fn allocate(&mut self, size: usize, align: usize) -> MemoryResult<Segment> {
        self.allocate_inner(size, align, true)
    }

    fn close(&mut self) -> MemoryResult<()> {
        // A failed close leaves the pool untouched so the owner can retry.
        self.delegate.close()?;
        self.cursor.release();
        Ok(())
    }
}

impl<C: SliceCursor> Drop for SlicingArena<C> {
    fn drop(&mut self) {
        if self.delegate.scope().is_alive()
            && let Err(error) = self.close()
        {
            warn!(%error, scope = self.delegate.scope().id(), "dropped lease could not be closed");
        }
    }
}

impl<C: SliceCursor> fmt::Debug for SlicingArena<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlicingArena")
            .field("segment", &format_args!("{:#x}", self.segment.address()))
            .field("byte_size", &self.segment.byte_size())
            .field("offset", &self.cursor.offset())
            .field("scope", self.delegate.scope())
            .finish()
    }
}
