//! # nebula-arena-pool
//!
//! Worker-local recycled arenas for high-frequency, short-lived native buffers.
//!
//! Every worker thread owns one fixed-size segment per [`ArenaPool`]. A
//! [`Lease`] taken from the pool bump-allocates slices of that segment and
//! hands it back on close, so steady-state scratch allocation never touches
//! the global allocator. Requests that do not fit are served by plain
//! allocation instead of failing.
//!
//! ## Quick Start
//!
//! ```rust
//! use nebula_arena_pool::prelude::*;
//!
//! # fn main() -> MemoryResult<()> {
//! let pool = ArenaPool::create_aligned(1024, 16)?;
//!
//! let mut lease = pool.take();
//! let header = lease.allocate(16, 8)?;
//! header.set_u64(0, 0xfeed)?;
//! assert_eq!(header.get_u64(0)?, 0xfeed);
//!
//! // Closing invalidates every segment of the lease.
//! lease.close()?;
//! assert!(header.get_u64(0).unwrap_err().is_already_closed());
//! # Ok(())
//! # }
//! ```
//!
//! ## Workers and tasks
//!
//! - On a thread of a multi-thread Tokio runtime, tasks may move between
//!   workers at `.await` points. The worker's segment is handed to one lease
//!   at a time through a compare-and-set; concurrent takers get plain arenas.
//! - On any other thread leases may nest freely and share one bump pointer.
//!
//! All arenas are confined to their owner. Inside a Tokio task the owner is
//! the task, so a lease from a multiplexed worker survives task migration.
//! Outside a task the owner is the thread, unless a
//! [`TaskScope`](scope::TaskScope) gives the code a task identity of its own.
//!
//! ## Architecture
//!
//! - Standalone error handling via [`error`] module
//! - Structured logging via `tracing`
//! - Safe segment access: bytes are copied in and out, never borrowed

#![cfg_attr(docsrs, feature(doc_cfg))]
// Raw block allocation and segment access live behind checked safe APIs
#![allow(unsafe_code)]

// Error types
pub mod error;

// Core modules
pub mod config;
pub mod lease;
pub(crate) mod pool;
pub mod registry;
pub mod scope;
pub mod stats;
pub mod utils;
pub mod worker;

pub use crate::config::{ArenaPoolConfig, VariantSelection};
pub use crate::error::{MemoryError, MemoryResult};
pub use crate::lease::Lease;
pub use crate::pool::PoolVariant;
pub use crate::registry::ArenaPool;
pub use crate::scope::{Arena, Segment};
pub use crate::stats::PoolStats;
pub use crate::worker::WorkerKind;

// Public API exports
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::config::{ArenaPoolConfig, VariantSelection};
    pub use crate::error::{MemoryError, MemoryResult};
    pub use crate::lease::Lease;
    pub use crate::registry::ArenaPool;
    pub use crate::scope::{Arena, ScopedArena, Segment, TaskScope};
    pub use crate::stats::PoolStats;
}
