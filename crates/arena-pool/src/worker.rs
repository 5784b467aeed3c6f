//! Worker classification

use tokio::runtime::{Handle, RuntimeFlavor};

use crate::pool::PoolVariant;

/// What kind of worker the current thread is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    /// Inside a multi-thread Tokio runtime: tasks may migrate to other workers
    /// between `.await` points
    Multiplexed,
    /// Any other thread, hosting one logical task at a time
    Plain,
}

impl WorkerKind {
    /// Classifies the current thread
    ///
    /// Threads with a current-thread runtime handle count as plain: their
    /// tasks never leave the thread.
    #[must_use]
    pub fn current() -> Self {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() != RuntimeFlavor::CurrentThread => {
                Self::Multiplexed
            }
            _ => Self::Plain,
        }
    }

    /// Pool variant suited to this kind of worker
    #[must_use]
    pub fn pool_variant(self) -> PoolVariant {
        match self {
            Self::Multiplexed => PoolVariant::Exclusive,
            Self::Plain => PoolVariant::Shared,
        }
    }
}
