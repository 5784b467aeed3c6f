//! Owner region and the recyclable segment carved from it

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{MemoryError, MemoryResult};
use crate::scope::{MemoryScope, RawBlock, Segment};

/// How an owner region ends its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegionLifetime {
    /// Never retired explicitly; the bytes go away with the last reference
    Automatic,
    /// Retired by the worker termination hook
    Closeable,
}

/// Backing allocation of one worker pool
///
/// The bytes are returned to the allocator only when the last `Arc` to the
/// region is dropped. Closing a closeable region retires it, so no new
/// segment can be carved, but leases that still hold it keep their memory.
pub(crate) struct OwnerRegion {
    block: RawBlock,
    lifetime: RegionLifetime,
    closed: AtomicBool,
}

impl OwnerRegion {
    pub(crate) fn allocate(layout: Layout, lifetime: RegionLifetime) -> MemoryResult<Arc<Self>> {
        Ok(Arc::new(Self {
            block: RawBlock::zeroed(layout)?,
            lifetime,
            closed: AtomicBool::new(false),
        }))
    }

    /// Carves the single recyclable segment covering the whole region
    pub(crate) fn recycled_segment(&self) -> MemoryResult<RecycledSegment> {
        if self.is_closed() {
            return Err(MemoryError::invalid_state("owner region already retired"));
        }
        Ok(RecycledSegment {
            base: self.block.ptr(),
            size: self.block.size(),
        })
    }

    /// Retires a closeable region; automatic regions ignore the request
    pub(crate) fn close(&self) {
        if self.lifetime == RegionLifetime::Closeable {
            self.closed.store(true, Ordering::Release);
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Fixed `(base, size)` extent reused by every lease of one pool
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecycledSegment {
    base: NonNull<u8>,
    size: usize,
}

impl RecycledSegment {
    #[inline]
    pub(crate) fn address(&self) -> usize {
        self.base.as_ptr() as usize
    }

    #[inline]
    pub(crate) fn byte_size(&self) -> usize {
        self.size
    }

    /// Views `start..start + len` as a segment bound to `scope`, without re-validation
    ///
    /// # Safety
    ///
    /// `start + len` must not exceed the segment size, the owner region must
    /// stay reachable for as long as `scope` is alive, and no other live
    /// scope may view the same bytes.
    #[inline]
    pub(crate) unsafe fn reinterpret(&self, start: usize, len: usize, scope: MemoryScope) -> Segment {
        debug_assert!(start.checked_add(len).is_some_and(|end| end <= self.size));
        // SAFETY: caller guarantees the range is inside the region.
        let ptr = unsafe { self.base.add(start) };
        // SAFETY: region bytes are initialised (zeroed at allocation), and the
        // caller guarantees reachability and exclusivity.
        unsafe { Segment::from_raw_parts(ptr, len, scope) }
    }
}

// SAFETY: RecycledSegment is an address range; it never dereferences the
// pointer itself, and access goes through confined `Segment`s.
unsafe impl Send for RecycledSegment {}
// SAFETY: see `Send`.
unsafe impl Sync for RecycledSegment {}
