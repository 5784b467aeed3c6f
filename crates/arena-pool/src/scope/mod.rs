//! Scoped allocation arenas
//!
//! The pool hands out arenas through the [`Arena`] trait. This module holds
//! the building blocks underneath it:
//! - [`Owner`] / [`TaskScope`]: who an arena is confined to
//! - [`MemoryScope`]: liveness, confinement checks and close actions
//! - [`Segment`]: checked view of native memory bound to a scope
//! - [`ScopedArena`]: plain arena returning one zeroed block per request

use std::alloc::Layout;

use crate::error::MemoryResult;

mod arena;
mod block;
mod memory_scope;
mod owner;
mod segment;

pub(crate) use self::block::RawBlock;
pub(crate) use self::memory_scope::CloseAction;

pub use self::arena::ScopedArena;
pub use self::memory_scope::MemoryScope;
pub use self::owner::{Owner, TaskId, TaskScope};
pub use self::segment::Segment;

/// Arena with an explicit, confined lifetime
///
/// Segments allocated through an arena become inaccessible the moment it
/// closes. Allocation and close are confined to the arena's owner.
pub trait Arena {
    /// Scope shared by this arena and every segment it returned
    fn scope(&self) -> &MemoryScope;

    /// Allocates without clearing memory that may hold stale bytes
    ///
    /// The returned bytes are always initialised, but may contain data written
    /// by an earlier, already closed arena.
    fn allocate_no_init(&mut self, size: usize, align: usize) -> MemoryResult<Segment>;

    /// Allocates `size` zeroed bytes aligned to `align`
    fn allocate(&mut self, size: usize, align: usize) -> MemoryResult<Segment> {
        let segment = self.allocate_no_init(size, align)?;
        segment.fill(0)?;
        Ok(segment)
    }

    /// Allocates `size` zeroed bytes with no alignment requirement
    fn allocate_bytes(&mut self, size: usize) -> MemoryResult<Segment> {
        self.allocate(size, 1)
    }

    /// Allocates zeroed memory sized and aligned for `layout`
    fn allocate_layout(&mut self, layout: Layout) -> MemoryResult<Segment> {
        self.allocate(layout.size(), layout.align())
    }

    /// Closes the arena, invalidating every segment it returned
    fn close(&mut self) -> MemoryResult<()>;

    /// Whether the arena is still open
    fn is_open(&self) -> bool {
        self.scope().is_alive()
    }
}
