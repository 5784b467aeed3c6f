//! Worker-local arena pools
//!
//! Every worker thread lazily builds one [`WorkerPool`] per [`ArenaPool`] on
//! its first `take()`. The pools live in a `thread_local!` table whose
//! destructor closes them when the thread exits.

use std::alloc::Layout;
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tracing::{trace, warn};

use crate::config::ArenaPoolConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::lease::Lease;
use crate::pool::WorkerPool;
use crate::scope::ScopedArena;
use crate::stats::{PoolStats, StatsCounters};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static WORKER_POOLS: RefCell<WorkerSlots> = RefCell::new(WorkerSlots::default());
}

struct PoolSlot {
    pool_id: u64,
    owner_alive: Weak<()>,
    /// `None` when the backing region could not be allocated on this worker
    pool: Option<WorkerPool>,
}

impl PoolSlot {
    fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close();
        }
    }
}

#[derive(Default)]
struct WorkerSlots {
    slots: Vec<PoolSlot>,
}

impl WorkerSlots {
    /// The worker pool for `owner`, built on first use
    ///
    /// A failed build is remembered, so the allocation is attempted and
    /// reported once per worker.
    fn pool_for(&mut self, owner: &ArenaPool) -> Option<&WorkerPool> {
        if let Some(index) = self.slots.iter().position(|slot| slot.pool_id == owner.id) {
            return self.slots[index].pool.as_ref();
        }

        self.prune();
        let pool = match WorkerPool::new(owner.config.variant.resolve(), owner.layout, owner.stats.clone()) {
            Ok(pool) => Some(pool),
            Err(error) => {
                warn!(%error, pool = owner.id, "worker pool allocation failed, this worker hands out fallback leases");
                None
            }
        };
        self.slots.push(PoolSlot {
            pool_id: owner.id,
            owner_alive: Arc::downgrade(&owner.alive),
            pool,
        });
        self.slots.last().and_then(|slot| slot.pool.as_ref())
    }

    /// Closes pools whose `ArenaPool` has been dropped everywhere
    fn prune(&mut self) {
        self.slots.retain(|slot| {
            let alive = slot.owner_alive.strong_count() > 0;
            if !alive {
                slot.close();
            }
            alive
        });
    }
}

impl Drop for WorkerSlots {
    fn drop(&mut self) {
        for slot in self.slots.drain(..) {
            slot.close();
        }
    }
}

/// Pool of worker-local recycled arenas
///
/// Each worker thread that calls [`take`](Self::take) gets its own recycled
/// segment of the configured size. On a multiplexed worker (a thread of a
/// multi-thread Tokio runtime) one lease at a time slices the segment and
/// concurrent takers receive plain arenas. On any other thread leases stack
/// on a shared bump pointer that rewinds once they have all closed.
///
/// Cloning is cheap; clones share worker pools and statistics.
///
/// # Examples
///
/// ```
/// use nebula_arena_pool::{Arena, ArenaPool};
///
/// let pool = ArenaPool::create(64).unwrap();
///
/// let mut lease = pool.take();
/// let first = lease.allocate(64, 1).unwrap();
/// let address = first.address();
/// lease.close().unwrap();
///
/// // The next lease on this thread reuses the same bytes.
/// let mut lease = pool.take();
/// assert_eq!(lease.allocate(64, 1).unwrap().address(), address);
/// lease.close().unwrap();
/// ```
#[derive(Clone)]
pub struct ArenaPool {
    id: u64,
    config: ArenaPoolConfig,
    layout: Layout,
    stats: Option<Arc<StatsCounters>>,
    alive: Arc<()>,
}

impl ArenaPool {
    /// Creates a pool of `byte_size` segments with no alignment requirement
    pub fn create(byte_size: usize) -> MemoryResult<Self> {
        Self::with_config(ArenaPoolConfig::new(byte_size))
    }

    /// Creates a pool of `byte_size` segments aligned to `byte_alignment`
    pub fn create_aligned(byte_size: usize, byte_alignment: usize) -> MemoryResult<Self> {
        Self::with_config(ArenaPoolConfig::new(byte_size).with_alignment(byte_alignment))
    }

    /// Creates a pool whose segments fit `layout`
    pub fn with_layout(layout: Layout) -> Self {
        Self::from_parts(ArenaPoolConfig::from_layout(layout), layout)
    }

    /// Creates a pool from a full configuration
    pub fn with_config(config: ArenaPoolConfig) -> MemoryResult<Self> {
        let layout = config.layout()?;
        Ok(Self::from_parts(config, layout))
    }

    fn from_parts(config: ArenaPoolConfig, layout: Layout) -> Self {
        let stats = config.track_stats.then(|| Arc::new(StatsCounters::default()));
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            config,
            layout,
            stats,
            alive: Arc::new(()),
        }
    }

    /// Takes a lease from the current worker's pool
    ///
    /// Never fails: when the worker pool cannot be reached or built, the lease
    /// is a plain arena instead.
    pub fn take(&self) -> Lease {
        let lease = WORKER_POOLS
            .try_with(|cell| match cell.try_borrow_mut() {
                Ok(mut slots) => Ok(slots.pool_for(self).map(WorkerPool::take)),
                Err(_) => Err(MemoryError::invalid_state("worker pool table in use")),
            })
            .unwrap_or_else(|_| Err(MemoryError::invalid_state("worker pool table destroyed")));

        let lease = match lease {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                trace!(pool = self.id, "no worker pool on this worker, handing out fallback lease");
                Lease::fallback(ScopedArena::confined())
            }
            Err(error) => {
                warn!(%error, pool = self.id, "worker pool unavailable, handing out fallback lease");
                Lease::fallback(ScopedArena::confined())
            }
        };

        if let Some(stats) = &self.stats {
            stats.record_lease(lease.is_pooled());
        }
        lease
    }

    /// Usage statistics; all zeros unless `track_stats` is enabled
    pub fn stats(&self) -> PoolStats {
        self.stats
            .as_ref()
            .map(|stats| stats.snapshot())
            .unwrap_or_default()
    }

    /// The configuration this pool was built from
    pub fn config(&self) -> &ArenaPoolConfig {
        &self.config
    }

    /// Segment layout of every worker pool
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Process-unique id of this pool
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for ArenaPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaPool")
            .field("id", &self.id)
            .field("byte_size", &self.layout.size())
            .field("byte_alignment", &self.layout.align())
            .field("variant", &self.config.variant)
            .finish()
    }
}
