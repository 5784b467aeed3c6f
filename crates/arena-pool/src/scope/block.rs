//! Zero-initialised raw blocks from the global allocator

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::{MemoryError, MemoryResult};

/// One allocation from the global allocator, freed on drop
pub(crate) struct RawBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl RawBlock {
    /// Allocates a zeroed block; zero-sized layouts get an aligned dangling pointer
    pub(crate) fn zeroed(layout: Layout) -> MemoryResult<Self> {
        let raw = if layout.size() == 0 {
            std::ptr::without_provenance_mut::<u8>(layout.align())
        } else {
            // SAFETY: layout has a non-zero size, checked above.
            unsafe { alloc::alloc_zeroed(layout) }
        };
        let ptr = NonNull::new(raw).ok_or_else(|| MemoryError::allocation_failed(layout))?;
        Ok(Self { ptr, layout })
    }

    #[inline]
    pub(crate) fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for RawBlock {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: ptr came from alloc_zeroed with this exact layout and is
            // released exactly once, here.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
        }
    }
}

// SAFETY: RawBlock uniquely owns its allocation; the pointer carries no
// thread affinity and the block itself never reads or writes the bytes.
unsafe impl Send for RawBlock {}
// SAFETY: shared access only exposes the address and size.
unsafe impl Sync for RawBlock {}
