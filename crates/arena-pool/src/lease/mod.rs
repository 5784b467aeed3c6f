//! Leases handed out by [`ArenaPool::take`](crate::ArenaPool::take)

use std::fmt;

use crate::error::MemoryResult;
use crate::scope::{Arena, MemoryScope, ScopedArena, Segment};

mod cursor;
mod keep_alive;
mod slicing;

pub(crate) use self::cursor::{CarrierCursor, SharedCursor};
pub(crate) use self::slicing::SlicingArena;
use self::slicing::{CarrierSlicingArena, SharedSlicingArena};

enum LeaseKind {
    Carrier(CarrierSlicingArena),
    Shared(SharedSlicingArena),
    Fallback(ScopedArena),
}

/// A scoped arena borrowed from a worker pool
///
/// Allocations are sliced from the worker's recycled segment while they fit
/// and are served by plain allocation otherwise, so no request fails because
/// the segment is too small. Closing the lease invalidates every segment it
/// returned and hands the recycled segment back. Dropping an open lease tries
/// to close it.
///
/// # Examples
///
/// ```
/// use nebula_arena_pool::{Arena, ArenaPool};
///
/// let pool = ArenaPool::create(256).unwrap();
/// let mut lease = pool.take();
/// let buffer = lease.allocate(64, 8).unwrap();
/// buffer.copy_from_slice(0, b"scratch").unwrap();
/// lease.close().unwrap();
/// ```
pub struct Lease {
    kind: LeaseKind,
}

impl Lease {
    pub(crate) fn carrier(arena: CarrierSlicingArena) -> Self {
        Self {
            kind: LeaseKind::Carrier(arena),
        }
    }

    pub(crate) fn shared(arena: SharedSlicingArena) -> Self {
        Self {
            kind: LeaseKind::Shared(arena),
        }
    }

    pub(crate) fn fallback(arena: ScopedArena) -> Self {
        Self {
            kind: LeaseKind::Fallback(arena),
        }
    }

    /// Whether this lease slices a recycled segment
    #[must_use]
    pub fn is_pooled(&self) -> bool {
        !matches!(self.kind, LeaseKind::Fallback(_))
    }

    fn arena(&self) -> &dyn Arena {
        match &self.kind {
            LeaseKind::Carrier(arena) => arena,
            LeaseKind::Shared(arena) => arena,
            LeaseKind::Fallback(arena) => arena,
        }
    }

    fn arena_mut(&mut self) -> &mut dyn Arena {
        match &mut self.kind {
            LeaseKind::Carrier(arena) => arena,
            LeaseKind::Shared(arena) => arena,
            LeaseKind::Fallback(arena) => arena,
        }
    }
}

impl Arena for Lease {
    fn scope(&self) -> &MemoryScope {
        self.arena().scope()
    }

    #[inline]
    fn allocate_no_init(&mut self, size: usize, align: usize) -> MemoryResult<Segment> {
        self.arena_mut().allocate_no_init(size, align)
    }

    #[inline]
    fn allocate(&mut self, size: usize, align: usize) -> MemoryResult<Segment> {
        self.arena_mut().allocate(size, align)
    }

    fn close(&mut self) -> MemoryResult<()> {
        self.arena_mut().close()
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LeaseKind::Carrier(arena) => fmt::Debug::fmt(arena, f),
            LeaseKind::Shared(arena) => fmt::Debug::fmt(arena, f),
            LeaseKind::Fallback(arena) => fmt::Debug::fmt(arena, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_lease() {
        let mut lease = Lease::fallback(ScopedArena::confined());
        assert!(!lease.is_pooled());
        assert!(lease.is_open());
        let segment = lease.allocate(32, 8).unwrap();
        assert_eq!(segment.to_vec().unwrap(), vec![0; 32]);
        assert!(format!("{lease:?}").contains("ScopedArena"));

        lease.close().unwrap();
        assert!(!lease.is_open());
        assert!(segment.get_u8(0).unwrap_err().is_already_closed());
    }
}
