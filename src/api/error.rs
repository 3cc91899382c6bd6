//! Allocation errors.

use thiserror::Error;

/// Errors returned by scope construction and allocation.
///
/// Exhaustion is an expected outcome for a fixed-capacity scope, so it is
/// reported as a value. Callers decide whether to degrade, retry after a
/// reset, or abort.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// Not enough free space left for the request.
    #[error("out of memory: requested {requested} bytes (align {align}), {available} bytes available")]
    OutOfMemory {
        /// Bytes requested by the caller.
        requested: usize,
        /// Alignment requested by the caller.
        align: usize,
        /// Bytes still free in the scope.
        available: usize,
    },

    /// Enough bytes are free in total, but no single free block fits.
    #[error("fragmented: requested {requested} bytes (align {align}), {free} bytes free across blocks")]
    Fragmented {
        /// Bytes requested by the caller.
        requested: usize,
        /// Alignment requested by the caller.
        align: usize,
        /// Total free bytes across all free blocks.
        free: usize,
    },

    /// Size/alignment pair cannot describe a valid allocation.
    #[error("invalid layout: size {size}, align {align}")]
    InvalidLayout {
        /// Requested size.
        size: usize,
        /// Requested alignment.
        align: usize,
    },

    /// Capacity cannot hold even the allocator's own bookkeeping.
    #[error("capacity {capacity} is below the minimum of {minimum} bytes")]
    CapacityTooSmall {
        /// Requested capacity.
        capacity: usize,
        /// Smallest usable capacity.
        minimum: usize,
    },

    /// The system allocator refused to provide the backing buffer.
    #[error("failed to acquire a {capacity} byte backing buffer")]
    BackingAllocation {
        /// Requested capacity.
        capacity: usize,
    },
}

impl AllocError {
    /// True for the exhaustion variants (`OutOfMemory` and `Fragmented`).
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. } | Self::Fragmented { .. })
    }
}
