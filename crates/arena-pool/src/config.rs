//! Arena pool configuration

use std::alloc::Layout;

use crate::error::{MemoryError, MemoryResult};
use crate::pool::PoolVariant;
use crate::utils::check_size_and_align;
use crate::worker::WorkerKind;

/// Which pool variant a worker builds on its first `take()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VariantSelection {
    /// Pick from the worker kind: exclusive on multiplexed workers, shared otherwise
    #[default]
    Auto,
    /// Always the single-slot, compare-and-set guarded pool
    Exclusive,
    /// Always the stacking, thread-confined pool
    Shared,
}

impl VariantSelection {
    /// Resolves the selection for the current worker
    #[must_use]
    pub fn resolve(self) -> PoolVariant {
        match self {
            Self::Auto => WorkerKind::current().pool_variant(),
            Self::Exclusive => PoolVariant::Exclusive,
            Self::Shared => PoolVariant::Shared,
        }
    }
}

/// Configuration of an [`ArenaPool`](crate::ArenaPool)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaPoolConfig {
    /// Size of the recycled segment each worker owns
    pub byte_size: usize,
    /// Alignment of the recycled segment
    pub byte_alignment: usize,
    /// Pool variant selection
    pub variant: VariantSelection,
    /// Whether to track usage statistics
    pub track_stats: bool,
}

impl ArenaPoolConfig {
    /// Creates a config for a `byte_size` segment with no alignment requirement
    pub fn new(byte_size: usize) -> Self {
        Self {
            byte_size,
            byte_alignment: 1,
            variant: VariantSelection::Auto,
            track_stats: cfg!(debug_assertions),
        }
    }

    /// Small scratch buffers: 4KB, word aligned
    pub fn small() -> Self {
        Self::new(4 * 1024).with_alignment(8)
    }

    /// Medium scratch buffers: 64KB, cache-line aligned
    pub fn medium() -> Self {
        Self::new(64 * 1024).with_alignment(64)
    }

    /// Sizes and aligns the segment from a layout
    pub fn from_layout(layout: Layout) -> Self {
        Self::new(layout.size()).with_alignment(layout.align())
    }

    /// Sets the segment alignment (checked by [`validate`](Self::validate))
    #[must_use = "builder methods must be chained or built"]
    pub fn with_alignment(mut self, byte_alignment: usize) -> Self {
        self.byte_alignment = byte_alignment;
        self
    }

    /// Forces or relaxes the pool variant choice
    #[must_use = "builder methods must be chained or built"]
    pub fn with_variant(mut self, variant: VariantSelection) -> Self {
        self.variant = variant;
        self
    }

    /// Enables/disables statistics tracking
    #[must_use = "builder methods must be chained or built"]
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.track_stats = enabled;
        self
    }

    /// Segment layout, after validation
    pub fn layout(&self) -> MemoryResult<Layout> {
        check_size_and_align(self.byte_size, self.byte_alignment).map_err(|error| match error {
            MemoryError::InvalidArgument { reason } => {
                MemoryError::invalid_argument(format!("pool segment: {reason}"))
            }
            other => other,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> MemoryResult<()> {
        self.layout().map(drop)
    }
}

impl Default for ArenaPoolConfig {
    fn default() -> Self {
        Self::small()
    }
}
