//! Implementation of `std::alloc::Allocator` for scopes.
//!
//! This module requires the `nightly` feature and a nightly Rust compiler.
//! It lets standard collections (`Vec::new_in`, `Box::new_in`) live in an
//! arena or free list.
//!
//! Enable with:
//! ```toml
//! [dependencies]
//! scopealloc = { version = "0.3", features = ["nightly"] }
//! ```

use std::alloc::{AllocError as StdAllocError, Allocator, Layout};
use std::cell::RefCell;
use std::ptr::NonNull;

use crate::allocators::arena::Arena;
use crate::allocators::free_list::FreeList;

/// An arena usable as a `std::alloc::Allocator`.
///
/// Deallocation is a no-op; memory comes back when the arena is reset.
///
/// # Example
///
/// ```rust,ignore
/// use std::cell::RefCell;
/// use scopealloc::{Arena, ArenaAllocator};
///
/// let arena = RefCell::new(Arena::new(4096).unwrap());
/// let alloc = unsafe { ArenaAllocator::new(&arena) };
/// let mut vec: Vec<u32, _> = Vec::new_in(alloc);
/// vec.push(42);
/// ```
#[derive(Clone, Copy)]
pub struct ArenaAllocator<'a> {
    arena: &'a RefCell<Arena>,
}

impl<'a> ArenaAllocator<'a> {
    /// Wrap an arena.
    ///
    /// # Safety
    ///
    /// The arena must not be reset or rewound while any collection using
    /// this allocator is alive.
    pub unsafe fn new(arena: &'a RefCell<Arena>) -> Self {
        Self { arena }
    }
}

unsafe impl Allocator for ArenaAllocator<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, StdAllocError> {
        let mut arena = self.arena.try_borrow_mut().map_err(|_| StdAllocError)?;
        let ptr = arena.allocate_layout(layout).map_err(|_| StdAllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {}
}

/// A free list usable as a `std::alloc::Allocator`.
///
/// Construction is `unsafe`: the `RefCell` lets safe code swap the list out
/// while a collection still holds blocks from its buffer.
///
/// ```rust,compile_fail
/// #![feature(allocator_api)]
/// use std::cell::RefCell;
/// use scopealloc::{FreeList, FreeListAllocator};
///
/// let list = RefCell::new(FreeList::new(4096).unwrap());
/// let alloc = FreeListAllocator::new(&list);
/// ```
#[derive(Clone, Copy)]
pub struct FreeListAllocator<'a> {
    list: &'a RefCell<FreeList>,
}

impl<'a> FreeListAllocator<'a> {
    /// Wrap a free list.
    ///
    /// # Safety
    ///
    /// The list must not be replaced, destroyed or dropped while any
    /// collection using this allocator is alive.
    pub unsafe fn new(list: &'a RefCell<FreeList>) -> Self {
        Self { list }
    }
}

unsafe impl Allocator for FreeListAllocator<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, StdAllocError> {
        let mut list = self.list.try_borrow_mut().map_err(|_| StdAllocError)?;
        let ptr = list.allocate_layout(layout).map_err(|_| StdAllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        self.list.borrow_mut().deallocate(ptr.as_ptr());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_in_free_list() {
        let list = RefCell::new(FreeList::new(4096).unwrap());
        {
            let alloc = unsafe { FreeListAllocator::new(&list) };
            let mut values: Vec<u64, _> = Vec::new_in(alloc);
            values.extend(0..64);
            assert_eq!(values.iter().sum::<u64>(), 2016);
        }
        assert_eq!(list.borrow().used(), 0);
    }

    #[test]
    fn test_list_replaced_after_collection_dropped() {
        let list = RefCell::new(FreeList::new(4096).unwrap());
        {
            let alloc = unsafe { FreeListAllocator::new(&list) };
            let mut values: Vec<u64, _> = Vec::new_in(alloc);
            values.extend(0..64);
            // Replacing the list here would break the contract of `new`.
        }

        // Every block is back, so swapping the list out is sound now.
        assert_eq!(list.borrow().live_allocations(), 0);
        *list.borrow_mut() = FreeList::new(1024).unwrap();
        assert_eq!(list.borrow().capacity(), 1024);
    }

    #[test]
    fn test_vec_in_arena() {
        let arena = RefCell::new(Arena::new(4096).unwrap());
        {
            let alloc = unsafe { ArenaAllocator::new(&arena) };
            let mut values: Vec<u32, _> = Vec::with_capacity_in(16, alloc);
            values.push(42);
            assert_eq!(values[0], 42);
        }
        assert!(arena.borrow().allocated() >= 64);
        arena.borrow_mut().reset();
    }
}
