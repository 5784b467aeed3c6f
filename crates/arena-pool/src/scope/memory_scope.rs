//! Confined memory scopes: liveness, ownership and close actions

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use super::block::RawBlock;
use super::owner::Owner;
use crate::error::{MemoryError, MemoryResult};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Action executed when a scope closes
pub(crate) type CloseAction = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct ScopeResources {
    blocks: Vec<RawBlock>,
    close_actions: Vec<CloseAction>,
}

struct ScopeInner {
    id: u64,
    owner: Owner,
    alive: AtomicBool,
    resources: Mutex<ScopeResources>,
}

/// Lifetime and confinement identity shared by an arena and its segments
///
/// Cloning is cheap and yields the same scope. Memory registered with the
/// scope is released when it closes; if it is never closed, the memory is
/// released once the arena and every segment referencing it are gone.
///
/// Only the arena that created a scope can close it, so a pooled lease always
/// hands its segment back to the pool:
///
/// ```compile_fail
/// use nebula_arena_pool::{Arena, ArenaPool};
///
/// let pool = ArenaPool::create(64).unwrap();
/// let lease = pool.take();
/// lease.scope().close().unwrap();
/// ```
#[derive(Clone)]
pub struct MemoryScope {
    inner: Arc<ScopeInner>,
}

impl MemoryScope {
    /// Creates a scope confined to `owner`
    #[must_use]
    pub(crate) fn confined_to(owner: Owner) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
                owner,
                alive: AtomicBool::new(true),
                resources: Mutex::new(ScopeResources::default()),
            }),
        }
    }

    /// Unique id of this scope
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The owner every operation on this scope is confined to
    #[must_use]
    pub fn owner(&self) -> Owner {
        self.inner.owner
    }

    /// Whether the scope has not been closed yet
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Checks that the caller owns the scope and that the scope is still open
    ///
    /// Confinement is checked first, so a non-owner observes
    /// [`MemoryError::WrongThread`] even on a closed scope.
    #[inline]
    pub fn check_valid_state(&self, operation: &'static str) -> MemoryResult<()> {
        if !self.inner.owner.is_current() {
            return Err(MemoryError::wrong_thread(operation));
        }
        if !self.is_alive() {
            return Err(MemoryError::AlreadyClosed);
        }
        Ok(())
    }

    /// Registers an action to run when the scope closes
    ///
    /// The action (and anything it captures) lives as long as the scope does,
    /// which makes it a reachability anchor for resources segments point into.
    pub(crate) fn add_close_action(&self, action: CloseAction) -> MemoryResult<()> {
        self.check_valid_state("add close action")?;
        self.inner.resources.lock().close_actions.push(action);
        Ok(())
    }

    pub(crate) fn adopt_block(&self, block: RawBlock) {
        self.inner.resources.lock().blocks.push(block);
    }

    /// Closes the scope, running close actions and freeing owned memory
    ///
    /// Fails without side effects when called by a non-owner, so the close
    /// can be retried later by the owner.
    pub(crate) fn close(&self) -> MemoryResult<()> {
        self.check_valid_state("close")?;
        self.inner.alive.store(false, Ordering::Release);

        let resources = std::mem::take(&mut *self.inner.resources.lock());
        for action in resources.close_actions.into_iter().rev() {
            action();
        }
        drop(resources.blocks);
        Ok(())
    }
}

impl PartialEq for MemoryScope {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for MemoryScope {}

impl fmt::Debug for MemoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryScope")
            .field("id", &self.inner.id)
            .field("owner", &self.inner.owner)
            .field("alive", &self.is_alive())
            .finish()
    }
}
