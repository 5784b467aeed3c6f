//! Plain confined arena: every allocation is a fresh zeroed block

use std::fmt;

use tracing::warn;

use super::block::RawBlock;
use super::memory_scope::MemoryScope;
use super::owner::Owner;
use super::segment::Segment;
use super::Arena;
use crate::error::MemoryResult;
use crate::utils::check_size_and_align;

/// Arena whose allocations are all released together when it closes
///
/// Operations are confined to the owner that created it. Dropping an open
/// arena closes it when the drop happens on the owner; otherwise the memory
/// stays reserved until the last segment referencing the scope is dropped.
///
/// # Examples
///
/// ```
/// use nebula_arena_pool::scope::{Arena, ScopedArena};
///
/// let mut arena = ScopedArena::confined();
/// let segment = arena.allocate(16, 8).unwrap();
/// segment.set_u64(0, 42).unwrap();
/// assert_eq!(segment.get_u64(0).unwrap(), 42);
///
/// arena.close().unwrap();
/// assert!(segment.get_u64(0).unwrap_err().is_already_closed());
/// ```
pub struct ScopedArena {
    scope: MemoryScope,
}

impl ScopedArena {
    /// Creates an arena confined to the current owner (task or thread)
    #[must_use]
    pub fn confined() -> Self {
        Self::with_owner(Owner::current())
    }

    /// Creates an arena confined to the current OS thread, even inside a task
    #[must_use]
    pub fn thread_confined() -> Self {
        Self::with_owner(Owner::current_thread())
    }

    pub(crate) fn with_owner(owner: Owner) -> Self {
        Self {
            scope: MemoryScope::confined_to(owner),
        }
    }

    fn allocate_block(&self, size: usize, align: usize) -> MemoryResult<Segment> {
        self.scope.check_valid_state("allocate")?;
        let layout = check_size_and_align(size, align)?;
        let block = RawBlock::zeroed(layout)?;
        // SAFETY: the block is zeroed, writable, exclusively viewed by this
        // scope and owned by it until the scope closes or is dropped.
        let segment = unsafe { Segment::from_raw_parts(block.ptr(), block.size(), self.scope.clone()) };
        self.scope.adopt_block(block);
        Ok(segment)
    }
}

impl Arena for ScopedArena {
    fn scope(&self) -> &MemoryScope {
        &self.scope
    }

    fn allocate_no_init(&mut self, size: usize, align: usize) -> MemoryResult<Segment> {
        self.allocate_block(size, align)
    }

    fn allocate(&mut self, size: usize, align: usize) -> MemoryResult<Segment> {
        // Fresh blocks come back zeroed already.
        self.allocate_block(size, align)
    }

    fn close(&mut self) -> MemoryResult<()> {
        self.scope.close()
    }
}

impl Drop for ScopedArena {
    fn drop(&mut self) {
        if self.scope.is_alive()
            && self.scope.owner().is_current()
            && let Err(error) = self.scope.close()
        {
            warn!(%error, scope = self.scope.id(), "dropped arena could not be closed");
        }
    }
}

impl fmt::Debug for ScopedArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedArena").field("scope", &self.scope).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::error::MemoryError;

    #[test]
    fn test_allocations_are_zeroed_and_aligned() {
        let mut arena = ScopedArena::confined();
        let segment = arena.allocate(24, 16).unwrap();
        assert_eq!(segment.byte_size(), 24);
        assert_eq!(segment.address() % 16, 0);
        assert_eq!(segment.to_vec().unwrap(), vec![0; 24]);
    }

    #[test]
    fn test_invalid_arguments() {
        let mut arena = ScopedArena::confined();
        assert!(arena.allocate(usize::MAX, 1).unwrap_err().is_invalid_argument());
        assert!(arena.allocate(8, 3).unwrap_err().is_invalid_argument());
        assert!(arena.allocate(8, 0).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_zero_sized_allocation() {
        let mut arena = ScopedArena::confined();
        let segment = arena.allocate(0, 8).unwrap();
        assert_eq!(segment.byte_size(), 0);
        assert!(segment.to_vec().unwrap().is_empty());
        assert!(segment.get_u8(0).is_err());
    }

    #[test]
    fn test_segment_bounds() {
        let mut arena = ScopedArena::confined();
        let segment = arena.allocate(8, 1).unwrap();
        assert_eq!(
            segment.get_u64(1),
            Err(MemoryError::OutOfBounds {
                offset: 1,
                len: 8,
                size: 8
            })
        );
        assert!(segment.set_u8(usize::MAX, 1).is_err());

        let tail = segment.slice(4, 4).unwrap();
        tail.set_u32(0, 0xdead_beef).unwrap();
        assert_eq!(segment.get_u32(4).unwrap(), 0xdead_beef);
        assert!(segment.slice(5, 4).is_err());
    }

    #[test]
    fn test_copy_in_and_out() {
        let mut arena = ScopedArena::confined();
        let segment = arena.allocate_bytes(6).unwrap();
        segment.copy_from_slice(1, b"abcd").unwrap();

        let mut out = [0_u8; 4];
        segment.read_into(1, &mut out).unwrap();
        assert_eq!(&out, b"abcd");
        assert_eq!(segment.to_vec().unwrap(), b"\0abcd\0");
    }

    #[test]
    fn test_use_after_close() {
        let mut arena = ScopedArena::confined();
        let segment = arena.allocate(8, 8).unwrap();
        arena.close().unwrap();

        let err = segment.get_u8(0).unwrap_err();
        assert_eq!(err.to_string(), "Already closed");
        assert!(arena.allocate(8, 8).unwrap_err().is_already_closed());
        assert!(arena.close().unwrap_err().is_already_closed());
    }

    #[test]
    fn test_confinement() {
        let mut arena = ScopedArena::confined();
        let segment = arena.allocate(8, 8).unwrap();

        let remote = segment.clone();
        let err = thread::spawn(move || remote.get_u8(0)).join().unwrap().unwrap_err();
        assert!(err.is_wrong_thread());

        let mut foreign = thread::spawn(ScopedArena::confined).join().unwrap();
        assert!(foreign.allocate(8, 8).unwrap_err().is_wrong_thread());
        assert!(foreign.close().unwrap_err().is_wrong_thread());
        assert!(foreign.scope().is_alive());
    }

    #[test]
    fn test_allocate_layout() {
        let mut arena = ScopedArena::confined();
        let segment = arena.allocate_layout(std::alloc::Layout::new::<[u32; 3]>()).unwrap();
        assert_eq!(segment.byte_size(), 12);
        assert_eq!(segment.address() % 4, 0);
        assert_eq!(segment.to_vec().unwrap(), vec![0; 12]);
    }

    #[test]
    fn test_drop_on_owner_closes() {
        let arena = ScopedArena::confined();
        let scope = arena.scope().clone();
        drop(arena);
        assert!(!scope.is_alive());
    }
}
