//! Arena - bump allocator for frame-temporary allocations.
//!
//! No per-object free: the whole arena is reclaimed at once by `reset()`.

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::allocators::backing::{BackingBuffer, BackingInit};
use crate::api::error::AllocError;
use crate::api::scope::{ArenaMark, ArenaScope};
use crate::api::stats::AllocStats;
use crate::api::allocator::AllocatorKind;
use crate::diagnostics::{emit_with_context, SA001, SA002};
use crate::util::layout::checked_align_up;

/// A bump allocator over a fixed-size backing buffer.
///
/// Allocations are a pointer bump plus an alignment round-up.
/// All allocations are invalidated on `reset()`.
pub struct Arena {
    /// Owned backing buffer
    buffer: BackingBuffer,

    /// Offset of the next free byte
    cursor: usize,

    /// Highest cursor seen since construction
    peak: usize,

    /// Bumped on every full reset so stale marks can be detected
    epoch: u64,

    /// Number of rewinds since construction
    rewinds: u64,

    /// `(rewind number, target)` pairs with strictly increasing targets.
    /// The first entry newer than a mark holds the lowest cursor reached
    /// since that mark was taken. Cleared on reset.
    floors: Vec<(u64, usize)>,

    allocation_count: u64,
    failed_allocations: u64,
    reset_count: u64,
}

impl Arena {
    /// Create an arena with an uninitialized backing buffer.
    pub fn new(capacity: usize) -> Result<Self, AllocError> {
        Self::with_init(capacity, BackingInit::Uninit)
    }

    /// Create an arena, choosing how the backing buffer is initialized.
    pub fn with_init(capacity: usize, init: BackingInit) -> Result<Self, AllocError> {
        let buffer = BackingBuffer::new(capacity, init)?;

        log::debug!(target: "scopealloc", "arena created ({} bytes)", capacity);

        Ok(Self {
            buffer,
            cursor: 0,
            peak: 0,
            epoch: 0,
            rewinds: 0,
            floors: Vec::new(),
            allocation_count: 0,
            failed_allocations: 0,
            reset_count: 0,
        })
    }

    /// Allocate `size` bytes aligned to `align`.
    ///
    /// `align` must be a non-zero power of two. Zero-sized requests succeed
    /// and return an aligned pointer that must not be dereferenced.
    pub fn allocate(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");

        // Align the address, not the offset, so alignments above the
        // backing buffer's own alignment still hold.
        let current = self.buffer.addr() + self.cursor;
        let end = checked_align_up(current, align)
            .map(|aligned| aligned - self.buffer.addr())
            .and_then(|offset| offset.checked_add(size).map(|end| (offset, end)));

        let (offset, end) = match end {
            Some((offset, end)) if end <= self.buffer.capacity() => (offset, end),
            _ => return Err(self.exhausted(size, align)),
        };

        self.cursor = end;
        self.peak = self.peak.max(end);
        self.allocation_count += 1;

        // SAFETY: offset <= end <= capacity.
        let ptr = unsafe { self.buffer.at(offset) };

        log::trace!(target: "scopealloc", "arena alloc {} bytes (align {}) at offset {}", size, align, offset);

        Ok(ptr)
    }

    /// Allocate memory with a specific layout.
    pub fn allocate_layout(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.allocate(layout.size(), layout.align())
    }

    /// Allocate `size` zeroed bytes aligned to `align`.
    pub fn allocate_zeroed(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.allocate(size, align)?;
        // SAFETY: the block was just claimed and lies within the buffer.
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Ok(ptr)
    }

    fn exhausted(&mut self, size: usize, align: usize) -> AllocError {
        self.failed_allocations += 1;
        let available = self.remaining();

        emit_with_context(
            &SA001,
            &format!(
                "requested {} bytes (align {}), {} of {} bytes used",
                size,
                align,
                self.cursor,
                self.buffer.capacity()
            ),
        );

        AllocError::OutOfMemory { requested: size, align, available }
    }

    /// Reset the arena, invalidating all allocations.
    ///
    /// Memory is not zeroed.
    pub fn reset(&mut self) {
        #[cfg(feature = "debug")]
        self.poison_range(0, self.cursor);

        log::debug!(target: "scopealloc", "arena reset ({} bytes released)", self.cursor);

        self.cursor = 0;
        self.epoch += 1;
        self.floors.clear();
        self.reset_count += 1;
    }

    /// Save the current cursor position.
    pub fn mark(&self) -> ArenaMark {
        ArenaMark::new(self.cursor, self.epoch, self.rewinds)
    }

    /// Whether rewinding to `mark` would release only memory allocated
    /// after it.
    ///
    /// A mark goes stale on `reset()`, and when any rewind since it was
    /// taken went below its cursor: the space above that point may already
    /// belong to newer allocations.
    pub fn is_mark_live(&self, mark: ArenaMark) -> bool {
        if mark.epoch() != self.epoch || mark.cursor() > self.cursor {
            return false;
        }

        let newer = self.floors.partition_point(|&(rewind, _)| rewind <= mark.rewinds());
        match self.floors.get(newer) {
            Some(&(_, floor)) => floor >= mark.cursor(),
            None => true,
        }
    }

    /// Roll back to a previously saved mark, releasing everything allocated
    /// after it.
    ///
    /// Stale marks (see [`is_mark_live`](Self::is_mark_live)) are rejected
    /// with a diagnostic and leave the arena unchanged.
    pub fn reset_to(&mut self, mark: ArenaMark) {
        if !self.is_mark_live(mark) {
            emit_with_context(
                &SA002,
                &format!(
                    "mark at {} (epoch {}, rewind {}), cursor at {} (epoch {}, rewind {})",
                    mark.cursor(),
                    mark.epoch(),
                    mark.rewinds(),
                    self.cursor,
                    self.epoch,
                    self.rewinds
                ),
            );
            return;
        }

        self.rewind(mark.cursor());
    }

    /// Move the cursor back to `target`. Callers check the mark first.
    pub(crate) fn rewind(&mut self, target: usize) {
        debug_assert!(target <= self.cursor);

        #[cfg(feature = "debug")]
        self.poison_range(target, self.cursor);

        self.cursor = target;
        self.rewinds += 1;

        while matches!(self.floors.last(), Some(&(_, floor)) if floor >= target) {
            self.floors.pop();
        }
        self.floors.push((self.rewinds, target));
    }

    /// Open a nested scope that rolls back on drop.
    pub fn scope(&mut self) -> ArenaScope<'_> {
        ArenaScope::new(self)
    }

    #[cfg(feature = "debug")]
    fn poison_range(&mut self, from: usize, to: usize) {
        // SAFETY: from <= to <= capacity; the range is owned by this arena.
        unsafe {
            crate::debug::poison::poison(
                self.buffer.at(from).as_ptr(),
                to - from,
                crate::debug::RESET_PATTERN,
            );
        }
    }

    /// Get remaining capacity.
    pub fn remaining(&self) -> usize {
        self.buffer.capacity() - self.cursor
    }

    /// Get total capacity.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Get bytes currently claimed, including alignment padding.
    pub fn allocated(&self) -> usize {
        self.cursor
    }

    /// Highest cursor position since construction.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Whether `ptr` points into this arena's backing buffer.
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.buffer.contains(ptr)
    }

    /// Snapshot of the arena's telemetry.
    pub fn stats(&self) -> AllocStats {
        let remaining = self.remaining();
        AllocStats {
            kind: AllocatorKind::Arena,
            capacity: self.capacity(),
            used: self.cursor,
            peak_used: self.peak,
            allocation_count: self.allocation_count,
            deallocation_count: 0,
            failed_allocations: self.failed_allocations,
            reset_count: self.reset_count,
            free_blocks: usize::from(remaining > 0),
            largest_free_block: remaining,
        }
    }

    /// Release the backing buffer.
    ///
    /// Consumes the arena; dropping it has the same effect.
    pub fn destroy(self) {
        log::debug!(target: "scopealloc", "arena destroyed ({} bytes)", self.capacity());
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("cursor", &self.cursor)
            .field("capacity", &self.capacity())
            .field("peak", &self.peak)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_allocation() {
        let mut arena = Arena::new(1024).unwrap();

        let ptr1 = arena.allocate(4, 4).unwrap();
        let ptr2 = arena.allocate(8, 8).unwrap();

        assert_ne!(ptr1, ptr2);
        assert!(arena.contains(ptr1.as_ptr()));
        assert!(arena.contains(ptr2.as_ptr()));
        assert_eq!(ptr2.as_ptr() as usize % 8, 0);
    }

    #[test]
    fn test_reset() {
        let mut arena = Arena::new(1024).unwrap();

        let ptr1 = arena.allocate(4, 4).unwrap();
        arena.reset();
        assert_eq!(arena.allocated(), 0);

        // New allocation should reuse the same memory
        let ptr2 = arena.allocate(4, 4).unwrap();
        assert_eq!(ptr1, ptr2);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut arena = Arena::new(128).unwrap();
        arena.reset();
        arena.reset();
        assert_eq!(arena.allocated(), 0);
        assert!(arena.allocate(128, 1).is_ok());
        arena.reset();
        assert!(arena.allocate(129, 1).is_err());
    }

    #[test]
    fn test_exhaustion() {
        let mut arena = Arena::new(32).unwrap();

        arena.allocate(16, 16).unwrap();
        arena.allocate(16, 16).unwrap();

        let err = arena.allocate(16, 16).unwrap_err();
        assert_eq!(err, AllocError::OutOfMemory { requested: 16, align: 16, available: 0 });
        assert_eq!(arena.stats().failed_allocations, 1);
        // A failed allocation leaves the cursor alone.
        assert_eq!(arena.allocated(), 32);
    }

    #[test]
    fn test_padding_is_consumed() {
        // 64-byte arena: 10 bytes at align 4, then 10 bytes at align 16.
        let mut arena = Arena::new(64).unwrap();

        let a = arena.allocate(10, 4).unwrap();
        let b = arena.allocate(10, 16).unwrap();

        assert_eq!(b.as_ptr() as usize % 16, 0);
        assert!(b.as_ptr() as usize >= a.as_ptr() as usize + 10);
        // Backing buffer is 16-aligned, so the second block starts at 16.
        assert_eq!(arena.allocated(), 26);
        assert!(arena.allocated() <= arena.capacity());
    }

    #[test]
    fn test_large_alignment() {
        let mut arena = Arena::new(1024).unwrap();
        arena.allocate(1, 1).unwrap();
        let ptr = arena.allocate(8, 256).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 256, 0);
    }

    #[test]
    fn test_zero_size_allocation() {
        let mut arena = Arena::new(16).unwrap();
        arena.allocate(16, 1).unwrap();

        // Full arena still hands out zero-sized blocks.
        let ptr = arena.allocate(0, 1).unwrap();
        assert_eq!(ptr.as_ptr() as usize, arena.buffer.addr() + 16);
    }

    #[test]
    fn test_zero_capacity_arena() {
        let mut arena = Arena::new(0).unwrap();
        assert!(arena.allocate(0, 8).is_ok());
        assert!(arena.allocate(1, 1).is_err());
    }

    #[test]
    fn test_allocate_zeroed() {
        let mut arena = Arena::new(64).unwrap();
        let dirty = arena.allocate(32, 8).unwrap();
        unsafe { std::ptr::write_bytes(dirty.as_ptr(), 0xAB, 32) };
        arena.reset();

        let clean = arena.allocate_zeroed(32, 8).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(clean.as_ptr(), 32) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_overflowing_request_fails() {
        let mut arena = Arena::new(64).unwrap();
        arena.allocate(1, 1).unwrap();
        assert!(arena.allocate(usize::MAX, 8).is_err());
    }

    #[test]
    fn test_mark_and_reset_to() {
        let mut arena = Arena::new(256).unwrap();
        arena.allocate(16, 8).unwrap();

        let mark = arena.mark();
        arena.allocate(64, 8).unwrap();
        assert_eq!(arena.allocated(), 80);

        arena.reset_to(mark);
        assert_eq!(arena.allocated(), 16);
        assert_eq!(arena.peak(), 80);
    }

    #[test]
    fn test_stale_mark_is_ignored() {
        let mut arena = Arena::new(256).unwrap();
        arena.allocate(64, 8).unwrap();
        let mark = arena.mark();

        arena.reset();
        arena.allocate(128, 8).unwrap();
        arena.reset_to(mark);

        assert_eq!(arena.allocated(), 128);
    }

    #[test]
    fn test_mark_below_earlier_rewind_is_stale() {
        let mut arena = Arena::new(256).unwrap();
        let start = arena.mark();
        arena.allocate(64, 8).unwrap();
        let after_first = arena.mark();

        arena.reset_to(start);
        let live = arena.allocate(128, 8).unwrap();

        // `after_first` points into the middle of `live` now.
        assert!(!arena.is_mark_live(after_first));
        arena.reset_to(after_first);
        assert_eq!(arena.allocated(), 128);

        let next = arena.allocate(32, 8).unwrap();
        assert!(next.as_ptr() as usize >= live.as_ptr() as usize + 128);
    }

    #[test]
    fn test_marks_survive_rewinds_above_them() {
        let mut arena = Arena::new(256).unwrap();
        arena.allocate(16, 8).unwrap();
        let outer = arena.mark();
        arena.allocate(16, 8).unwrap();
        let inner = arena.mark();
        arena.allocate(16, 8).unwrap();

        arena.reset_to(inner);
        arena.allocate(64, 8).unwrap();
        assert!(arena.is_mark_live(inner));
        assert!(arena.is_mark_live(outer));

        arena.reset_to(outer);
        assert_eq!(arena.allocated(), 16);
    }

    #[test]
    fn test_mark_taken_after_rewind_is_live() {
        let mut arena = Arena::new(256).unwrap();
        arena.allocate(96, 8).unwrap();
        let start = arena.mark();
        arena.allocate(48, 8).unwrap();
        arena.reset_to(start);

        arena.allocate(80, 8).unwrap();
        let later = arena.mark();
        arena.allocate(8, 8).unwrap();

        arena.reset_to(later);
        assert_eq!(arena.allocated(), 176);
    }

    #[cfg(feature = "debug")]
    #[test]
    fn test_reset_poisons_memory() {
        let mut arena = Arena::new(64).unwrap();
        let ptr = arena.allocate(32, 8).unwrap();
        arena.reset();
        unsafe {
            assert!(crate::debug::poison::is_poisoned(ptr.as_ptr(), 32, crate::debug::RESET_PATTERN));
        }
    }
}
