//! Standalone error types for nebula-arena-pool
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.

use core::alloc::Layout;
use thiserror::Error;

// ============================================================================
// Main Error Types
// ============================================================================

/// Errors raised by arena pools, leases, scopes and segments
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    // --- Argument Errors ---
    /// Size or alignment rejected at pool creation or allocation
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // --- Confinement Errors ---
    /// Operation attempted by an execution unit that does not own the scope
    #[error("Attempted {operation} outside of the owning thread")]
    WrongThread { operation: &'static str },

    // --- State Errors ---
    /// Access to a scope (or a segment of a scope) that has been closed
    #[error("Already closed")]
    AlreadyClosed,

    /// Operation that is not permitted in the current state
    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    // --- Access Errors ---
    /// Segment access outside of the segment bounds
    #[error("Out of bounds access: offset {offset} + {len} bytes exceeds segment of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    // --- Allocation Errors ---
    /// The global allocator could not satisfy a request
    #[error("Memory allocation failed: {size} bytes with {align} byte alignment")]
    AllocationFailed { size: usize, align: usize },
}

impl MemoryError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "MEM:ARG:INVALID",
            Self::WrongThread { .. } => "MEM:SCOPE:WRONG_THREAD",
            Self::AlreadyClosed => "MEM:SCOPE:CLOSED",
            Self::InvalidState { .. } => "MEM:SYSTEM:STATE",
            Self::OutOfBounds { .. } => "MEM:SEGMENT:BOUNDS",
            Self::AllocationFailed { .. } => "MEM:ALLOC:FAILED",
        }
    }

    /// Check if this is a confinement violation
    #[must_use]
    pub fn is_wrong_thread(&self) -> bool {
        matches!(self, Self::WrongThread { .. })
    }

    /// Check if this is a use-after-close
    #[must_use]
    pub fn is_already_closed(&self) -> bool {
        matches!(self, Self::AlreadyClosed)
    }

    /// Check if this is an argument error
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create invalid argument error for a rejected size/alignment pair
    pub fn invalid_layout(size: usize, align: usize) -> Self {
        Self::invalid_argument(format!(
            "invalid size/alignment pair: {size} bytes aligned to {align}"
        ))
    }

    /// Create invalid alignment error
    pub fn invalid_alignment(align: usize) -> Self {
        Self::invalid_argument(format!("alignment {align} is not a power of two"))
    }

    /// Create wrong thread error
    pub fn wrong_thread(operation: &'static str) -> Self {
        Self::WrongThread { operation }
    }

    /// Create invalid state error
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Create out of bounds error
    pub fn out_of_bounds(offset: usize, len: usize, size: usize) -> Self {
        Self::OutOfBounds { offset, len, size }
    }

    /// Create allocation failed error from layout
    pub fn allocation_failed(layout: Layout) -> Self {
        tracing::error!(
            size = layout.size(),
            align = layout.align(),
            "global allocator returned null"
        );

        Self::AllocationFailed {
            size: layout.size(),
            align: layout.align(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for memory operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

// ============================================================================
// Tests
// ============================================================================
