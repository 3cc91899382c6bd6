//! The allocator facade.
//!
//! `Allocator` selects one of the two strategies at runtime; `MemoryScope`
//! is the capability set callers program against when they only need
//! "give me memory" and "take it back".

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::allocators::arena::Arena;
use crate::allocators::backing::BackingInit;
use crate::allocators::free_list::FreeList;
use crate::api::error::AllocError;
use crate::api::stats::AllocStats;

/// Which allocation strategy backs a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocatorKind {
    /// Bump allocation with bulk reset.
    Arena,
    /// First-fit allocation with per-block free.
    FreeList,
}

impl std::fmt::Display for AllocatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocatorKind::Arena => write!(f, "arena"),
            AllocatorKind::FreeList => write!(f, "free list"),
        }
    }
}

/// Memory that can be handed out and taken back.
///
/// Implemented by [`Arena`], [`FreeList`] and the [`Allocator`] facade.
/// All blocks are raw, untyped memory; the typed helpers only compute the
/// layout.
pub trait MemoryScope {
    /// Allocate `size` bytes aligned to `align` (a non-zero power of two).
    fn allocate(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError>;

    /// Return a block to the scope. Null pointers are ignored.
    ///
    /// Scopes without per-block free ignore every pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block allocated from this scope.
    unsafe fn deallocate(&mut self, ptr: *mut u8);

    /// Reclaim everything at once, where the strategy supports it.
    fn reset(&mut self) {}

    /// Which strategy backs this scope.
    fn kind(&self) -> AllocatorKind;

    /// Snapshot of the scope's telemetry.
    fn stats(&self) -> AllocStats;

    /// Allocate zeroed memory.
    fn allocate_zeroed(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.allocate(size, align)?;
        // SAFETY: the block holds at least `size` writable bytes.
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Ok(ptr)
    }

    /// Allocate memory for a layout.
    fn allocate_layout(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.allocate(layout.size(), layout.align())
    }

    /// Allocate uninitialized memory for one `T`.
    fn alloc<T>(&mut self) -> Result<NonNull<T>, AllocError>
    where
        Self: Sized,
    {
        self.allocate_layout(Layout::new::<T>()).map(NonNull::cast)
    }

    /// Allocate uninitialized memory for `count` values of `T`.
    fn alloc_array<T>(&mut self, count: usize) -> Result<NonNull<T>, AllocError>
    where
        Self: Sized,
    {
        let layout = Layout::array::<T>(count).map_err(|_| AllocError::InvalidLayout {
            size: std::mem::size_of::<T>().saturating_mul(count),
            align: std::mem::align_of::<T>(),
        })?;
        self.allocate_layout(layout).map(NonNull::cast)
    }

    /// Allocate a `T` and move `value` into it.
    fn alloc_value<T>(&mut self, value: T) -> Result<NonNull<T>, AllocError>
    where
        Self: Sized,
    {
        let ptr = self.alloc::<T>()?;
        // SAFETY: freshly allocated, properly aligned for T.
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }
}

impl MemoryScope for Arena {
    fn allocate(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        Arena::allocate(self, size, align)
    }

    unsafe fn deallocate(&mut self, _ptr: *mut u8) {
        // Arena memory is reclaimed in bulk by reset().
    }

    fn reset(&mut self) {
        Arena::reset(self);
    }

    fn kind(&self) -> AllocatorKind {
        AllocatorKind::Arena
    }

    fn stats(&self) -> AllocStats {
        Arena::stats(self)
    }
}

impl MemoryScope for FreeList {
    fn allocate(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        FreeList::allocate(self, size, align)
    }

    unsafe fn deallocate(&mut self, ptr: *mut u8) {
        FreeList::deallocate(self, ptr);
    }

    fn kind(&self) -> AllocatorKind {
        AllocatorKind::FreeList
    }

    fn stats(&self) -> AllocStats {
        FreeList::stats(self)
    }
}

/// A scope backed by either an arena or a free list.
///
/// # Example
///
/// ```rust
/// use scopealloc::{Allocator, AllocatorKind, MemoryScope};
///
/// let mut persistent = Allocator::free_list(64 * 1024).unwrap();
/// let pixels = persistent.alloc_array::<u8>(4 * 16 * 16).unwrap();
/// unsafe { persistent.deallocate(pixels.as_ptr()) };
///
/// let mut frame = Allocator::arena(16 * 1024).unwrap();
/// let _scratch = frame.allocate(512, 16).unwrap();
/// frame.reset();
/// assert_eq!(frame.kind(), AllocatorKind::Arena);
/// ```
#[derive(Debug)]
pub enum Allocator {
    /// Bump allocation with bulk reset.
    Arena(Arena),
    /// First-fit allocation with per-block free.
    FreeList(FreeList),
}

impl Allocator {
    /// Create an arena-backed scope.
    pub fn arena(capacity: usize) -> Result<Self, AllocError> {
        Arena::new(capacity).map(Self::Arena)
    }

    /// Create a free-list-backed scope.
    pub fn free_list(capacity: usize) -> Result<Self, AllocError> {
        FreeList::new(capacity).map(Self::FreeList)
    }

    /// Create a scope of the given kind.
    pub fn with_kind(kind: AllocatorKind, capacity: usize, init: BackingInit) -> Result<Self, AllocError> {
        match kind {
            AllocatorKind::Arena => Arena::with_init(capacity, init).map(Self::Arena),
            AllocatorKind::FreeList => FreeList::with_init(capacity, init).map(Self::FreeList),
        }
    }

    /// Allocate `size` bytes aligned to `align`.
    pub fn allocate(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        match self {
            Self::Arena(arena) => arena.allocate(size, align),
            Self::FreeList(list) => list.allocate(size, align),
        }
    }

    /// Return a block. A no-op for arenas and for null pointers.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block allocated from this scope.
    pub unsafe fn deallocate(&mut self, ptr: *mut u8) {
        match self {
            Self::Arena(_) => {}
            Self::FreeList(list) => list.deallocate(ptr),
        }
    }

    /// Reset an arena. A no-op for free lists.
    pub fn reset(&mut self) {
        match self {
            Self::Arena(arena) => arena.reset(),
            Self::FreeList(_) => {}
        }
    }

    /// Release the backing buffer.
    pub fn destroy(self) {
        match self {
            Self::Arena(arena) => arena.destroy(),
            Self::FreeList(list) => list.destroy(),
        }
    }

    /// Which strategy backs this scope.
    pub fn kind(&self) -> AllocatorKind {
        match self {
            Self::Arena(_) => AllocatorKind::Arena,
            Self::FreeList(_) => AllocatorKind::FreeList,
        }
    }

    /// Backing buffer size in bytes.
    pub fn capacity(&self) -> usize {
        match self {
            Self::Arena(arena) => arena.capacity(),
            Self::FreeList(list) => list.capacity(),
        }
    }

    /// Bytes currently reserved.
    pub fn used(&self) -> usize {
        match self {
            Self::Arena(arena) => arena.allocated(),
            Self::FreeList(list) => list.used(),
        }
    }

    /// Whether `ptr` points into this scope's backing buffer.
    pub fn contains(&self, ptr: *const u8) -> bool {
        match self {
            Self::Arena(arena) => arena.contains(ptr),
            Self::FreeList(list) => list.contains(ptr),
        }
    }

    /// Snapshot of the scope's telemetry.
    pub fn stats(&self) -> AllocStats {
        match self {
            Self::Arena(arena) => arena.stats(),
            Self::FreeList(list) => list.stats(),
        }
    }

    /// The arena, if this scope is arena-backed.
    pub fn as_arena(&mut self) -> Option<&mut Arena> {
        match self {
            Self::Arena(arena) => Some(arena),
            Self::FreeList(_) => None,
        }
    }

    /// The free list, if this scope is free-list-backed.
    pub fn as_free_list(&mut self) -> Option<&mut FreeList> {
        match self {
            Self::FreeList(list) => Some(list),
            Self::Arena(_) => None,
        }
    }
}

impl From<Arena> for Allocator {
    fn from(arena: Arena) -> Self {
        Self::Arena(arena)
    }
}

impl From<FreeList> for Allocator {
    fn from(list: FreeList) -> Self {
        Self::FreeList(list)
    }
}

impl MemoryScope for Allocator {
    fn allocate(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        Allocator::allocate(self, size, align)
    }

    unsafe fn deallocate(&mut self, ptr: *mut u8) {
        Allocator::deallocate(self, ptr);
    }

    fn reset(&mut self) {
        Allocator::reset(self);
    }

    fn kind(&self) -> AllocatorKind {
        Allocator::kind(self)
    }

    fn stats(&self) -> AllocStats {
        Allocator::stats(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_kind() {
        let mut arena = Allocator::arena(256).unwrap();
        let mut list = Allocator::free_list(256).unwrap();

        assert_eq!(arena.kind(), AllocatorKind::Arena);
        assert_eq!(list.kind(), AllocatorKind::FreeList);

        let a = arena.allocate(32, 8).unwrap();
        let b = list.allocate(32, 8).unwrap();
        assert!(arena.contains(a.as_ptr()));
        assert!(list.contains(b.as_ptr()));
        assert!(!arena.contains(b.as_ptr()));

        unsafe { list.deallocate(b.as_ptr()) };
        assert_eq!(list.used(), 0);
    }

    #[test]
    fn test_arena_deallocate_is_noop() {
        let mut arena = Allocator::arena(128).unwrap();
        let ptr = arena.allocate(64, 8).unwrap();

        unsafe { arena.deallocate(ptr.as_ptr()) };
        assert_eq!(arena.used(), 64);

        arena.reset();
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_free_list_reset_is_noop() {
        let mut list = Allocator::free_list(128).unwrap();
        let ptr = list.allocate(16, 8).unwrap();
        let used = list.used();

        list.reset();
        assert_eq!(list.used(), used);

        unsafe { list.deallocate(ptr.as_ptr()) };
        list.destroy();
    }

    #[test]
    fn test_typed_helpers() {
        let mut list = Allocator::free_list(1024).unwrap();

        let value = list.alloc_value(0xDEAD_BEEF_u64).unwrap();
        let floats = list.alloc_array::<f32>(16).unwrap();

        assert_eq!(value.as_ptr() as usize % std::mem::align_of::<u64>(), 0);
        assert_eq!(floats.as_ptr() as usize % std::mem::align_of::<f32>(), 0);
        unsafe {
            assert_eq!(*value.as_ptr(), 0xDEAD_BEEF);
            list.deallocate(value.as_ptr().cast());
            list.deallocate(floats.as_ptr().cast());
        }
    }

    #[test]
    fn test_array_overflow_is_invalid_layout() {
        let mut arena = Allocator::arena(64).unwrap();
        let err = arena.alloc_array::<u64>(usize::MAX).unwrap_err();
        assert!(matches!(err, AllocError::InvalidLayout { .. }));
    }

    #[test]
    fn test_generic_over_scope() {
        fn fill<S: MemoryScope>(scope: &mut S) -> NonNull<u8> {
            let ptr = scope.allocate_zeroed(32, 16).unwrap();
            assert_eq!(ptr.as_ptr() as usize % 16, 0);
            ptr
        }

        let mut arena = Arena::new(64).unwrap();
        let mut list = FreeList::new(128).unwrap();
        fill(&mut arena);
        let ptr = fill(&mut list);
        unsafe { MemoryScope::deallocate(&mut list, ptr.as_ptr()) };
        assert_eq!(MemoryScope::stats(&list).active_allocations(), 0);
    }

    #[test]
    fn test_with_kind() {
        let scope = Allocator::with_kind(AllocatorKind::FreeList, 512, BackingInit::Zeroed).unwrap();
        assert_eq!(scope.kind(), AllocatorKind::FreeList);
        assert_eq!(scope.capacity(), 512);
    }
}
