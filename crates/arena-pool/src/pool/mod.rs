//! Per-worker pools backing the leases
//!
//! Each worker owns one [`WorkerPool`]: an owner region, the recycled segment
//! carved from it, and the bump state for that segment. The variant is fixed
//! when the pool is built.

use std::alloc::Layout;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::MemoryResult;
use crate::lease::Lease;
use crate::stats::StatsCounters;

mod exclusive;
mod region;
mod shared;

pub(crate) use self::exclusive::ExclusivePool;
pub(crate) use self::region::{OwnerRegion, RecycledSegment};
#[cfg(test)]
pub(crate) use self::region::RegionLifetime;
pub(crate) use self::shared::SharedPool;

/// Flavour of a worker's pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolVariant {
    /// One lease at a time slices the segment; contenders get plain arenas
    Exclusive,
    /// Leases stack on one shared bump pointer, confined to the worker thread
    Shared,
}

impl fmt::Display for PoolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive => f.write_str("exclusive"),
            Self::Shared => f.write_str("shared"),
        }
    }
}

pub(crate) enum WorkerPool {
    Exclusive(Arc<ExclusivePool>),
    Shared(Arc<SharedPool>),
}

impl WorkerPool {
    pub(crate) fn new(
        variant: PoolVariant,
        layout: Layout,
        stats: Option<Arc<StatsCounters>>,
    ) -> MemoryResult<Self> {
        let pool = match variant {
            PoolVariant::Exclusive => Self::Exclusive(ExclusivePool::new(layout, stats)?),
            PoolVariant::Shared => Self::Shared(SharedPool::new(layout, stats)?),
        };
        debug!(
            %variant,
            size = layout.size(),
            align = layout.align(),
            "created worker arena pool"
        );
        Ok(pool)
    }

    #[inline]
    pub(crate) fn take(&self) -> Lease {
        match self {
            Self::Exclusive(pool) => pool.take(),
            Self::Shared(pool) => pool.take(),
        }
    }

    pub(crate) fn variant(&self) -> PoolVariant {
        match self {
            Self::Exclusive(_) => PoolVariant::Exclusive,
            Self::Shared(_) => PoolVariant::Shared,
        }
    }

    /// Worker termination: retires a closeable region, no-op otherwise
    pub(crate) fn close(&self) {
        match self {
            Self::Exclusive(pool) => pool.close(),
            Self::Shared(pool) => pool.close(),
        }
        debug!(variant = %self.variant(), "closed worker arena pool");
    }
}
