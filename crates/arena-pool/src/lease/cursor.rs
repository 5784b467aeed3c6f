//! Bump cursors for pooled leases
//!
//! Provides both lease-private and pool-shared bump pointers.

use std::sync::Arc;

use crate::pool::{ExclusivePool, SharedPool};

/// Where a pooled lease keeps its bump pointer and whom it notifies on close
pub(crate) trait SliceCursor: Send {
    fn offset(&self) -> usize;
    fn set_offset(&mut self, offset: usize);
    /// Hands the segment back to the pool; called once, after a successful close
    fn release(&mut self);
}

/// Lease-private cursor for a segment won from an [`ExclusivePool`]
pub(crate) struct CarrierCursor {
    offset: usize,
    pool: Arc<ExclusivePool>,
}

impl CarrierCursor {
    pub(crate) fn new(pool: Arc<ExclusivePool>) -> Self {
        Self { offset: 0, pool }
    }
}

impl SliceCursor for CarrierCursor {
    #[inline]
    fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    fn release(&mut self) {
        self.pool.release();
    }
}

/// Cursor reading and writing the bump pointer of a [`SharedPool`]
pub(crate) struct SharedCursor {
    pool: Arc<SharedPool>,
}

impl SharedCursor {
    pub(crate) fn new(pool: Arc<SharedPool>) -> Self {
        Self { pool }
    }
}

impl SliceCursor for SharedCursor {
    #[inline]
    fn offset(&self) -> usize {
        self.pool.offset()
    }

    #[inline]
    fn set_offset(&mut self, offset: usize) {
        self.pool.set_offset(offset);
    }

    fn release(&mut self) {
        self.pool.lease_closed();
    }
}
