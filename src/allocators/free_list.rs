//! Free list - general-purpose allocator for long-lived, individually freed
//! allocations (decoded images, audio samples, glyph bitmaps).
//!
//! Free memory is tracked by nodes written into the free memory itself,
//! linked in ascending address order. Allocation is first-fit; deallocation
//! coalesces with both neighbours immediately, so freeing everything always
//! restores a single free block.
//!
//! Layout of a reserved region:
//!
//! ```text
//! region start                header      usable pointer
//! |<----- alignment padding ---->|<- hdr ->|<---- size ---->|<- absorbed tail ->|
//! |<----------------------------- block_size ---------------------------------->|
//! ```

use std::alloc::Layout;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;

use crate::allocators::backing::{BackingBuffer, BackingInit};
use crate::api::allocator::AllocatorKind;
use crate::api::error::AllocError;
use crate::api::stats::AllocStats;
use crate::diagnostics::{emit_with_context, SA101, SA102, SA105, SA202};
use crate::util::layout::{checked_align_up, padding_with_header};

/// Bookkeeping placed immediately before every allocation.
#[repr(C)]
#[derive(Clone, Copy)]
struct Header {
    /// Whole reserved region: padding, header, payload and absorbed tail.
    block_size: usize,
    /// Alignment padding between region start and the header.
    padding: usize,
}

/// A free region, written at the region's first byte.
#[repr(C)]
struct FreeNode {
    next: Option<NonNull<FreeNode>>,
    block_size: usize,
}

const HEADER_SIZE: usize = size_of::<Header>();

/// Smallest block that can later hold a free node.
pub const MIN_BLOCK_SIZE: usize = size_of::<FreeNode>();

/// Alignment floor for every allocation; also the header's alignment.
pub const MIN_ALIGN: usize = 8;

const NODE_ALIGN: usize = align_of::<FreeNode>();

const _: () = assert!(align_of::<Header>() <= MIN_ALIGN);
const _: () = assert!(NODE_ALIGN <= MIN_ALIGN);

/// A free region, as offset and size within the backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRegion {
    /// Offset of the region from the start of the backing buffer.
    pub offset: usize,
    /// Size of the region in bytes.
    pub size: usize,
}

/// A coalescing first-fit allocator over a fixed-size backing buffer.
pub struct FreeList {
    /// Owned backing buffer
    buffer: BackingBuffer,

    /// Lowest-addressed free node, `None` when exhausted
    head: Option<NonNull<FreeNode>>,

    /// Bytes reserved by live allocations (telemetry)
    used: usize,
    peak_used: usize,

    allocation_count: u64,
    deallocation_count: u64,
    failed_allocations: u64,

    #[cfg(feature = "debug")]
    tracker: crate::debug::AllocationTracker,
}

impl FreeList {
    /// Create a free list with an uninitialized backing buffer.
    pub fn new(capacity: usize) -> Result<Self, AllocError> {
        Self::with_init(capacity, BackingInit::Uninit)
    }

    /// Create a free list, choosing how the backing buffer is initialized.
    ///
    /// Fails if `capacity` cannot hold a single free node.
    pub fn with_init(capacity: usize, init: BackingInit) -> Result<Self, AllocError> {
        if capacity < MIN_BLOCK_SIZE {
            emit_with_context(&SA202, &format!("capacity {} bytes, minimum {}", capacity, MIN_BLOCK_SIZE));
            return Err(AllocError::CapacityTooSmall {
                capacity,
                minimum: MIN_BLOCK_SIZE,
            });
        }

        let buffer = BackingBuffer::new(capacity, init)?;

        let first = buffer.base().cast::<FreeNode>();
        // SAFETY: the buffer is 16-aligned and holds at least one node.
        unsafe {
            first.as_ptr().write(FreeNode {
                next: None,
                block_size: capacity,
            });
        }

        log::debug!(target: "scopealloc", "free list created ({} bytes)", capacity);

        Ok(Self {
            buffer,
            head: Some(first),
            used: 0,
            peak_used: 0,
            allocation_count: 0,
            deallocation_count: 0,
            failed_allocations: 0,
            #[cfg(feature = "debug")]
            tracker: crate::debug::AllocationTracker::new(),
        })
    }

    /// Allocate `size` bytes aligned to `align`.
    ///
    /// `align` must be a non-zero power of two; it is raised to at least
    /// [`MIN_ALIGN`]. Sizes are raised to at least [`MIN_BLOCK_SIZE`].
    pub fn allocate(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");

        let align = align.max(MIN_ALIGN);
        let needed = match checked_align_up(size.max(MIN_BLOCK_SIZE), NODE_ALIGN) {
            Some(needed) => needed,
            None => return Err(self.exhausted(size, align, usize::MAX, self.total_free())),
        };

        // First fit, in address order.
        let mut prev: Option<NonNull<FreeNode>> = None;
        let mut cursor = self.head;
        let mut free = 0;

        while let Some(node) = cursor {
            // SAFETY: every node in the list lies inside the buffer and was
            // written by this allocator.
            let (node_size, next) = unsafe { ((*node.as_ptr()).block_size, (*node.as_ptr()).next) };
            let padding = padding_with_header(node.as_ptr() as usize, align, HEADER_SIZE);

            match needed.checked_add(padding) {
                Some(required) if required <= node_size => {
                    // SAFETY: `required <= node_size`, so the reservation
                    // stays inside this free node.
                    let ptr = unsafe { self.claim(prev, node, padding, required) };
                    log::trace!(
                        target: "scopealloc",
                        "free list alloc {} bytes (align {}) at offset {}",
                        size,
                        align,
                        ptr.as_ptr() as usize - self.buffer.addr()
                    );
                    return Ok(ptr);
                }
                _ => {}
            }

            free += node_size;
            prev = cursor;
            cursor = next;
        }

        Err(self.exhausted(size, align, needed, free))
    }

    /// Reserve `required` bytes at the start of `node` and unlink it.
    ///
    /// # Safety
    ///
    /// `node` must be a live list node whose predecessor is `prev`, and
    /// `padding <= required <= node.block_size`.
    unsafe fn claim(
        &mut self,
        prev: Option<NonNull<FreeNode>>,
        node: NonNull<FreeNode>,
        padding: usize,
        required: usize,
    ) -> NonNull<u8> {
        let node_size = (*node.as_ptr()).block_size;
        let mut replacement = (*node.as_ptr()).next;
        let region = node.cast::<u8>();

        // Split the tail off if it can hold a node; otherwise the tail stays
        // part of the block and comes back on deallocation.
        let remaining = node_size - required;
        let block_size = if remaining >= MIN_BLOCK_SIZE {
            let split = NonNull::new_unchecked(region.as_ptr().add(required)).cast::<FreeNode>();
            split.as_ptr().write(FreeNode {
                next: replacement,
                block_size: remaining,
            });
            replacement = Some(split);
            required
        } else {
            node_size
        };

        match prev {
            Some(p) => (*p.as_ptr()).next = replacement,
            None => self.head = replacement,
        }

        let usable = region.as_ptr().add(padding);
        usable.sub(HEADER_SIZE).cast::<Header>().write(Header {
            block_size,
            padding: padding - HEADER_SIZE,
        });

        self.used += block_size;
        self.peak_used = self.peak_used.max(self.used);
        self.allocation_count += 1;

        let usable = NonNull::new_unchecked(usable);

        #[cfg(feature = "debug")]
        self.tracker.record_alloc(usable.as_ptr() as usize, required - padding);

        usable
    }

    fn exhausted(&mut self, size: usize, align: usize, needed: usize, free: usize) -> AllocError {
        self.failed_allocations += 1;

        let blocks = self.free_block_count();
        let context = format!(
            "requested {} bytes (align {}), {} bytes free in {} blocks, largest {}",
            size,
            align,
            free,
            blocks,
            self.largest_free_block()
        );

        // Only split free space counts as fragmentation; a single block that
        // is too small is plain exhaustion.
        if blocks > 1 && free >= needed.saturating_add(HEADER_SIZE) {
            emit_with_context(&SA102, &context);
            AllocError::Fragmented { requested: size, align, free }
        } else {
            emit_with_context(&SA101, &context);
            AllocError::OutOfMemory { requested: size, align, available: free }
        }
    }

    /// Allocate memory with a specific layout.
    pub fn allocate_layout(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.allocate(layout.size(), layout.align())
    }

    /// Allocate `size` zeroed bytes aligned to `align`.
    pub fn allocate_zeroed(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.allocate(size, align)?;
        // SAFETY: the block holds at least `size` bytes.
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Ok(ptr)
    }

    /// Return a block to the free list, merging it with adjacent free
    /// blocks. Null pointers are ignored.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer returned by `allocate` on this free
    /// list that has not been deallocated since. Debug builds check this
    /// and panic with diagnostic SA103/SA104 on violations.
    pub unsafe fn deallocate(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }

        #[cfg(debug_assertions)]
        self.check_block(ptr);

        let header = ptr.sub(HEADER_SIZE).cast::<Header>().read();
        let region = ptr.sub(HEADER_SIZE + header.padding);
        let block_size = header.block_size;

        #[cfg(feature = "debug")]
        {
            self.tracker.record_free(ptr as usize);
            crate::debug::poison::poison(region, block_size, crate::debug::FREED_PATTERN);
        }

        let node = NonNull::new_unchecked(region).cast::<FreeNode>();

        // Find the insertion point that keeps the list address-ordered.
        let mut prev: Option<NonNull<FreeNode>> = None;
        let mut next = self.head;
        while let Some(n) = next {
            if n > node {
                break;
            }
            prev = next;
            next = (*n.as_ptr()).next;
        }

        node.as_ptr().write(FreeNode { next, block_size });
        match prev {
            Some(p) => (*p.as_ptr()).next = Some(node),
            None => self.head = Some(node),
        }

        // Coalesce forward.
        if let Some(n) = next {
            if end_of(node) == n.as_ptr() as usize {
                (*node.as_ptr()).block_size += (*n.as_ptr()).block_size;
                (*node.as_ptr()).next = (*n.as_ptr()).next;
            }
        }

        // Coalesce backward.
        if let Some(p) = prev {
            if end_of(p) == node.as_ptr() as usize {
                (*p.as_ptr()).block_size += (*node.as_ptr()).block_size;
                (*p.as_ptr()).next = (*node.as_ptr()).next;
            }
        }

        self.used -= block_size;
        self.deallocation_count += 1;

        log::trace!(
            target: "scopealloc",
            "free list dealloc {} bytes at offset {}",
            block_size,
            region as usize - self.buffer.addr()
        );
    }

    /// Validate a pointer passed to `deallocate`, panicking on misuse.
    #[cfg(debug_assertions)]
    fn check_block(&self, ptr: *mut u8) {
        use crate::diagnostics::{Diagnostic, SA103, SA104};

        fn fail(diag: &Diagnostic, context: String) -> ! {
            emit_with_context(diag, &context);
            panic!("[scopealloc][{}] {} ({})", diag.code, diag.message, context);
        }

        let base = self.buffer.addr();
        let end = base + self.buffer.capacity();
        let addr = ptr as usize;

        if !self.buffer.contains(ptr) || addr < base + HEADER_SIZE || addr % MIN_ALIGN != 0 {
            fail(&SA103, format!("pointer 0x{:x}, buffer 0x{:x}..0x{:x}", addr, base, end));
        }

        // SAFETY: the header lies inside the buffer, checked above.
        let header = unsafe { ptr.sub(HEADER_SIZE).cast::<Header>().read() };
        let region = (addr - HEADER_SIZE).checked_sub(header.padding);
        let region_end = region.and_then(|start| start.checked_add(header.block_size));

        let (start, stop) = match (region, region_end) {
            (Some(start), Some(stop))
                if start >= base && stop <= end && header.block_size >= MIN_BLOCK_SIZE =>
            {
                (start, stop)
            }
            _ => fail(
                &SA104,
                format!(
                    "pointer 0x{:x}, header block_size {} padding {}",
                    addr, header.block_size, header.padding
                ),
            ),
        };

        for node in self.nodes() {
            let node_start = node.as_ptr() as usize;
            if node_start < stop && start < end_of(node) {
                fail(
                    &SA104,
                    format!("block 0x{:x}..0x{:x} overlaps free block at 0x{:x}", start, stop, node_start),
                );
            }
        }
    }

    fn nodes(&self) -> impl Iterator<Item = NonNull<FreeNode>> + '_ {
        // SAFETY: list nodes are valid for the lifetime of `&self`.
        std::iter::successors(self.head, |node| unsafe { (*node.as_ptr()).next })
    }

    /// Free regions in list (ascending address) order.
    pub fn free_regions(&self) -> Vec<FreeRegion> {
        let base = self.buffer.addr();
        self.nodes()
            .map(|node| FreeRegion {
                offset: node.as_ptr() as usize - base,
                // SAFETY: see `nodes()`.
                size: unsafe { (*node.as_ptr()).block_size },
            })
            .collect()
    }

    /// Number of separate free regions.
    pub fn free_block_count(&self) -> usize {
        self.nodes().count()
    }

    /// Size of the largest free region.
    pub fn largest_free_block(&self) -> usize {
        self.free_regions().iter().map(|r| r.size).max().unwrap_or(0)
    }

    fn total_free(&self) -> usize {
        self.free_regions().iter().map(|r| r.size).sum()
    }

    /// Bytes reserved by live allocations, including headers and padding.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Bytes not reserved by live allocations.
    pub fn available(&self) -> usize {
        self.buffer.capacity() - self.used
    }

    /// Get total capacity.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Allocations handed out and not yet returned.
    pub fn live_allocations(&self) -> u64 {
        self.allocation_count - self.deallocation_count
    }

    /// Whether `ptr` points into this free list's backing buffer.
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.buffer.contains(ptr)
    }

    /// Snapshot of the free list's telemetry.
    pub fn stats(&self) -> AllocStats {
        AllocStats {
            kind: AllocatorKind::FreeList,
            capacity: self.capacity(),
            used: self.used,
            peak_used: self.peak_used,
            allocation_count: self.allocation_count,
            deallocation_count: self.deallocation_count,
            failed_allocations: self.failed_allocations,
            reset_count: 0,
            free_blocks: self.free_block_count(),
            largest_free_block: self.largest_free_block(),
        }
    }

    /// Release the backing buffer.
    ///
    /// Consumes the free list; dropping it has the same effect. Live
    /// allocations are reported as leaks.
    pub fn destroy(self) {
        log::debug!(target: "scopealloc", "free list destroyed ({} bytes)", self.capacity());
    }
}

impl Drop for FreeList {
    fn drop(&mut self) {
        let live = self.live_allocations();
        if live == 0 || std::thread::panicking() {
            return;
        }

        #[cfg(feature = "debug")]
        self.tracker.log_leak_report();

        emit_with_context(
            &SA105,
            &format!("{} live allocations, {} bytes", live, self.used),
        );
    }
}

impl std::fmt::Debug for FreeList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreeList")
            .field("capacity", &self.capacity())
            .field("used", &self.used)
            .field("free_regions", &self.free_regions())
            .finish()
    }
}

/// One past the last byte of a free node's region.
#[inline]
fn end_of(node: NonNull<FreeNode>) -> usize {
    // SAFETY: only called on live list nodes.
    node.as_ptr() as usize + unsafe { (*node.as_ptr()).block_size }
}
