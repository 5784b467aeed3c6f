//! Owner identity for confinement checks
//!
//! # Async-Safe Identity
//!
//! Code running inside a Tokio task is owned by that task, whichever worker
//! thread happens to poll it, so an arena taken in a task stays usable after
//! a multi-thread runtime moves the task elsewhere. Code outside any task is
//! owned by its OS thread.
//!
//! Futures driven without a task (for example the root future of
//! `Runtime::block_on`, or a hand-polled future) and synchronous code can opt
//! into a task identity with [`TaskScope`]. An active scope takes precedence
//! over the Tokio task id.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

static NEXT_SCOPE_TASK: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    static TASK: TaskId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum TaskKey {
    Runtime(tokio::task::Id),
    Scoped(u64),
}

/// Identity of a task an arena can be confined to
///
/// Either a Tokio task or a [`TaskScope`]. Ids cannot be constructed outside
/// this module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(TaskKey);

impl TaskId {
    fn next_scoped() -> Self {
        Self(TaskKey::Scoped(NEXT_SCOPE_TASK.fetch_add(1, Ordering::Relaxed)))
    }

    /// Id of the innermost active identity: a task scope, else the Tokio task
    fn current() -> Option<Self> {
        TASK.try_with(|id| *id)
            .ok()
            .or_else(|| tokio::task::try_id().map(|id| Self(TaskKey::Runtime(id))))
    }

    fn is_current(self) -> bool {
        match self.0 {
            TaskKey::Runtime(id) => tokio::task::try_id() == Some(id),
            TaskKey::Scoped(_) => TASK.try_with(|current| *current == self).unwrap_or(false),
        }
    }

    /// Whether this id was established by a [`TaskScope`]
    #[must_use]
    pub fn is_scoped(self) -> bool {
        matches!(self.0, TaskKey::Scoped(_))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            TaskKey::Runtime(id) => write!(f, "tokio-task-{id}"),
            TaskKey::Scoped(id) => write!(f, "task-scope-{id}"),
        }
    }
}

/// The execution unit a confined scope belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    /// An OS thread
    Thread(ThreadId),
    /// A task that may migrate between worker threads
    Task(TaskId),
}

impl Owner {
    /// Owner of the code currently executing
    #[inline]
    #[must_use]
    pub fn current() -> Self {
        TaskId::current().map_or_else(Self::current_thread, Self::Task)
    }

    /// Owner identity of the current OS thread, ignoring any task
    #[inline]
    #[must_use]
    pub fn current_thread() -> Self {
        Self::Thread(thread::current().id())
    }

    /// Whether the code currently executing is this owner
    #[inline]
    #[must_use]
    pub fn is_current(&self) -> bool {
        match self {
            Self::Thread(id) => *id == thread::current().id(),
            Self::Task(id) => id.is_current(),
        }
    }
}

/// Establishes a task identity for code that runs outside a Tokio task
///
/// Arenas taken inside the scope are confined to it rather than to the
/// thread, so a future driven by `block_on` or polled by hand keeps its
/// leases usable when it is moved to another thread between polls.
pub struct TaskScope;

impl TaskScope {
    /// Run a future with a fresh task identity active
    pub async fn run<F: Future>(f: F) -> F::Output {
        TASK.scope(TaskId::next_scoped(), f).await
    }

    /// Run a synchronous closure with a fresh task identity active
    pub fn run_sync<R>(f: impl FnOnce() -> R) -> R {
        TASK.sync_scope(TaskId::next_scoped(), f)
    }

    /// Identity of the innermost active task scope, if any
    #[must_use]
    pub fn current() -> Option<TaskId> {
        TASK.try_with(|id| *id).ok()
    }
}
