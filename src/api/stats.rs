//! Allocation statistics.
//!
//! Telemetry only: nothing in the allocators depends on these numbers.

use crate::api::allocator::AllocatorKind;
use crate::util::size::format_bytes;

/// Snapshot of one scope's allocation statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocStats {
    /// Which strategy produced the snapshot.
    pub kind: AllocatorKind,

    /// Backing buffer size in bytes.
    pub capacity: usize,

    /// Bytes currently reserved, including headers and padding.
    pub used: usize,

    /// Highest value `used` has reached.
    pub peak_used: usize,

    /// Successful allocations performed.
    pub allocation_count: u64,

    /// Explicit deallocations performed.
    pub deallocation_count: u64,

    /// Allocation requests that failed.
    pub failed_allocations: u64,

    /// Bulk resets performed.
    pub reset_count: u64,

    /// Number of separate free regions.
    pub free_blocks: usize,

    /// Size of the largest free region.
    pub largest_free_block: usize,
}

impl AllocStats {
    /// Bytes not currently reserved.
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.used)
    }

    /// Allocations not yet returned.
    pub fn active_allocations(&self) -> u64 {
        self.allocation_count.saturating_sub(self.deallocation_count)
    }

    /// Share of free memory outside the largest free block.
    ///
    /// 0.0 means all free memory is one block; values near 1.0 mean free
    /// memory is scattered in small pieces.
    pub fn fragmentation(&self) -> f64 {
        let free = self.available();
        if free == 0 {
            return 0.0;
        }
        1.0 - self.largest_free_block as f64 / free as f64
    }

    /// Fraction of the capacity currently reserved.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.used as f64 / self.capacity as f64
    }
}

impl std::fmt::Display for AllocStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} statistics:", self.kind)?;
        writeln!(f, "  Capacity:      {}", format_bytes(self.capacity))?;
        writeln!(f, "  Used:          {} ({:.1}%)", format_bytes(self.used), self.utilization() * 100.0)?;
        writeln!(f, "  Peak:          {}", format_bytes(self.peak_used))?;
        writeln!(f, "  Allocations:   {}", self.allocation_count)?;
        writeln!(f, "  Deallocations: {}", self.deallocation_count)?;
        writeln!(f, "  Failed:        {}", self.failed_allocations)?;
        writeln!(f, "  Resets:        {}", self.reset_count)?;
        writeln!(f, "  Free blocks:   {} (largest {})", self.free_blocks, format_bytes(self.largest_free_block))?;
        Ok(())
    }
}
