//! Bounds- and scope-checked views of native memory
//!
//! # Safety
//!
//! A [`Segment`] is a raw `(address, size)` view plus the [`MemoryScope`] it
//! is bound to. Every access:
//! - checks that the caller is the scope owner (so at most one execution unit
//!   touches the bytes at any time),
//! - checks that the scope is still alive (closing frees or recycles the
//!   memory),
//! - checks bounds.
//!
//! Bytes are only ever copied in and out; no reference into segment memory
//! escapes, so closing the scope while a borrow is outstanding is impossible.

use std::fmt;
use std::ptr::{self, NonNull};

use super::memory_scope::MemoryScope;
use crate::error::{MemoryError, MemoryResult};

/// A view of native memory bound to a scope
#[derive(Clone)]
pub struct Segment {
    ptr: NonNull<u8>,
    len: usize,
    scope: MemoryScope,
}

impl Segment {
    /// Creates a segment without re-validating the memory it covers
    ///
    /// # Safety
    ///
    /// `ptr..ptr + len` must be initialised, writable memory that stays
    /// allocated for as long as `scope` is alive, and no other live scope may
    /// view the same bytes.
    #[inline]
    pub(crate) unsafe fn from_raw_parts(ptr: NonNull<u8>, len: usize, scope: MemoryScope) -> Self {
        Self { ptr, len, scope }
    }

    /// Base address of the segment
    #[inline]
    #[must_use]
    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Size of the segment in bytes
    #[inline]
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.len
    }

    /// The scope governing this segment
    #[must_use]
    pub fn scope(&self) -> &MemoryScope {
        &self.scope
    }

    /// Whether the segment can still be accessed (scope not closed)
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.scope.is_alive()
    }

    #[inline]
    fn checked_ptr(&self, offset: usize, len: usize, operation: &'static str) -> MemoryResult<*mut u8> {
        self.scope.check_valid_state(operation)?;
        match offset.checked_add(len) {
            Some(end) if end <= self.len => {
                // SAFETY: offset + len is within the segment, so the result
                // stays inside (or one past) the same allocation.
                Ok(unsafe { self.ptr.as_ptr().add(offset) })
            }
            _ => Err(MemoryError::out_of_bounds(offset, len, self.len)),
        }
    }

    /// Sub-view of `len` bytes starting at `offset`, bound to the same scope
    pub fn slice(&self, offset: usize, len: usize) -> MemoryResult<Segment> {
        let ptr = self.checked_ptr(offset, len, "slice")?;
        // SAFETY: checked_ptr never returns null for a non-null base.
        let ptr = unsafe { NonNull::new_unchecked(ptr) };
        // SAFETY: the sub-range lies inside this segment and shares its scope.
        Ok(unsafe { Self::from_raw_parts(ptr, len, self.scope.clone()) })
    }

    /// Reads one byte
    pub fn get_u8(&self, offset: usize) -> MemoryResult<u8> {
        let ptr = self.checked_ptr(offset, 1, "read")?;
        // SAFETY: in bounds, initialised, scope alive and owned by the caller.
        Ok(unsafe { ptr.read() })
    }

    /// Writes one byte
    pub fn set_u8(&self, offset: usize, value: u8) -> MemoryResult<()> {
        let ptr = self.checked_ptr(offset, 1, "write")?;
        // SAFETY: in bounds, writable, scope alive and owned by the caller.
        unsafe { ptr.write(value) };
        Ok(())
    }

    /// Reads a native-endian `u32` (no alignment requirement)
    pub fn get_u32(&self, offset: usize) -> MemoryResult<u32> {
        let ptr = self.checked_ptr(offset, 4, "read")?;
        // SAFETY: 4 bytes in bounds; unaligned read.
        Ok(unsafe { ptr.cast::<u32>().read_unaligned() })
    }

    /// Writes a native-endian `u32` (no alignment requirement)
    pub fn set_u32(&self, offset: usize, value: u32) -> MemoryResult<()> {
        let ptr = self.checked_ptr(offset, 4, "write")?;
        // SAFETY: 4 bytes in bounds; unaligned write.
        unsafe { ptr.cast::<u32>().write_unaligned(value) };
        Ok(())
    }

    /// Reads a native-endian `u64` (no alignment requirement)
    pub fn get_u64(&self, offset: usize) -> MemoryResult<u64> {
        let ptr = self.checked_ptr(offset, 8, "read")?;
        // SAFETY: 8 bytes in bounds; unaligned read.
        Ok(unsafe { ptr.cast::<u64>().read_unaligned() })
    }

    /// Writes a native-endian `u64` (no alignment requirement)
    pub fn set_u64(&self, offset: usize, value: u64) -> MemoryResult<()> {
        let ptr = self.checked_ptr(offset, 8, "write")?;
        // SAFETY: 8 bytes in bounds; unaligned write.
        unsafe { ptr.cast::<u64>().write_unaligned(value) };
        Ok(())
    }

    /// Sets every byte of the segment to `value`
    pub fn fill(&self, value: u8) -> MemoryResult<()> {
        let ptr = self.checked_ptr(0, self.len, "fill")?;
        // SAFETY: the whole segment is in bounds and writable.
        unsafe { ptr::write_bytes(ptr, value, self.len) };
        Ok(())
    }

    /// Copies `src` into the segment at `offset`
    pub fn copy_from_slice(&self, offset: usize, src: &[u8]) -> MemoryResult<()> {
        let ptr = self.checked_ptr(offset, src.len(), "write")?;
        // SAFETY: destination in bounds; `src` cannot alias segment memory
        // because no reference into it is ever handed out.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), ptr, src.len()) };
        Ok(())
    }

    /// Copies bytes starting at `offset` into `dst`
    pub fn read_into(&self, offset: usize, dst: &mut [u8]) -> MemoryResult<()> {
        let ptr = self.checked_ptr(offset, dst.len(), "read")?;
        // SAFETY: source in bounds and initialised; `dst` is caller memory.
        unsafe { ptr::copy_nonoverlapping(ptr.cast_const(), dst.as_mut_ptr(), dst.len()) };
        Ok(())
    }

    /// Copies the whole segment into a new vector
    pub fn to_vec(&self) -> MemoryResult<Vec<u8>> {
        let mut out = vec![0; self.len];
        self.read_into(0, &mut out)?;
        Ok(out)
    }
}

// SAFETY: the segment is a handle; every byte access is gated on the caller
// being the scope owner, so moving or sharing the handle across threads can
// never produce concurrent access to the underlying memory.
unsafe impl Send for Segment {}
// SAFETY: see `Send`; all `&self` methods perform the same owner check.
unsafe impl Sync for Segment {}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("byte_size", &self.len)
            .field("scope", &self.scope.id())
            .finish()
    }
}
