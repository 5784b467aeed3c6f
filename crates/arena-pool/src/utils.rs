//! Alignment and allocation-argument helpers

use core::alloc::Layout;

use crate::error::{MemoryError, MemoryResult};

/// Aligns a value up to the nearest multiple of alignment
///
/// Returns `None` when the result does not fit in `usize`.
///
/// # Examples
/// ```
/// use nebula_arena_pool::utils::checked_align_up;
///
/// assert_eq!(checked_align_up(9, 8), Some(16));
/// assert_eq!(checked_align_up(usize::MAX, 8), None);
/// ```
#[inline(always)]
pub const fn checked_align_up(value: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    match value.checked_add(alignment - 1) {
        Some(bumped) => Some(bumped & !(alignment - 1)),
        None => None,
    }
}

/// Checks if a value is aligned to the given alignment
#[inline(always)]
pub const fn is_aligned(value: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    value & (alignment - 1) == 0
}

/// Validates a (size, alignment) pair against the general allocation rules
///
/// The alignment must be a non-zero power of two and the size, rounded up to
/// the alignment, must not exceed `isize::MAX`. A negative size handed over
/// from a signed API wraps to a value above `isize::MAX` and is rejected here.
///
/// # Examples
/// ```
/// use nebula_arena_pool::utils::check_size_and_align;
///
/// assert!(check_size_and_align(64, 16).is_ok());
/// assert!(check_size_and_align(1, 3).is_err());
/// assert!(check_size_and_align(usize::MAX, 1).is_err());
/// ```
pub fn check_size_and_align(size: usize, align: usize) -> MemoryResult<Layout> {
    if !align.is_power_of_two() {
        return Err(MemoryError::invalid_alignment(align));
    }
    Layout::from_size_align(size, align).map_err(|_| MemoryError::invalid_layout(size, align))
}
