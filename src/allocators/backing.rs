//! Backing buffers - the raw blocks every scope subdivides.
//!
//! This is the only place that talks to the system allocator.

use std::alloc::{alloc, alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use crate::api::error::AllocError;
use crate::diagnostics::{emit_with_context, SA201};

/// Alignment of every backing buffer.
pub(crate) const BACKING_ALIGN: usize = 16;

/// How a freshly acquired backing buffer is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackingInit {
    /// Leave the contents uninitialized.
    #[default]
    Uninit,
    /// Zero the whole buffer up front.
    Zeroed,
}

/// An exclusively owned, fixed-size raw memory block.
///
/// Released exactly once, on drop.
pub(crate) struct BackingBuffer {
    base: NonNull<u8>,
    capacity: usize,
}

impl BackingBuffer {
    /// Acquire a new buffer of `capacity` bytes.
    pub fn new(capacity: usize, init: BackingInit) -> Result<Self, AllocError> {
        if capacity == 0 {
            // Zero-sized layouts must not reach the system allocator.
            return Ok(Self {
                base: dangling_aligned(),
                capacity: 0,
            });
        }

        let layout = Layout::from_size_align(capacity, BACKING_ALIGN)
            .map_err(|_| AllocError::BackingAllocation { capacity })?;

        // SAFETY: layout has a non-zero size.
        let ptr = unsafe {
            match init {
                BackingInit::Uninit => alloc(layout),
                BackingInit::Zeroed => alloc_zeroed(layout),
            }
        };

        let base = NonNull::new(ptr).ok_or_else(|| {
            emit_with_context(&SA201, &format!("capacity {} bytes", capacity));
            AllocError::BackingAllocation { capacity }
        })?;

        log::debug!(target: "scopealloc", "acquired {} byte backing buffer at {:p}", capacity, base);

        Ok(Self { base, capacity })
    }

    /// Base address of the buffer.
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Base address as an integer.
    #[inline]
    pub fn addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Total capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pointer to the byte at `offset`.
    ///
    /// # Safety
    ///
    /// `offset` must be at most `capacity`.
    #[inline]
    pub unsafe fn at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.capacity);
        NonNull::new_unchecked(self.base.as_ptr().add(offset))
    }

    /// Whether `ptr` points into `[base, base + capacity)`.
    #[inline]
    pub fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        addr >= self.addr() && addr < self.addr() + self.capacity
    }
}

impl Drop for BackingBuffer {
    fn drop(&mut self) {
        if self.capacity == 0 {
            return;
        }

        // SAFETY: same size and alignment as in `new()`, which succeeded.
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.capacity, BACKING_ALIGN);
            dealloc(self.base.as_ptr(), layout);
        }

        log::debug!(target: "scopealloc", "released {} byte backing buffer", self.capacity);
    }
}

/// Non-null, `BACKING_ALIGN`-aligned address for empty buffers.
fn dangling_aligned() -> NonNull<u8> {
    // SAFETY: BACKING_ALIGN is non-zero.
    unsafe { NonNull::new_unchecked(BACKING_ALIGN as *mut u8) }
}
