//! The per-frame and persistent scopes a game loop passes around.
//!
//! Scopes are owned values handed to whoever needs memory; there is no
//! global allocator state, so several independent pairs can coexist.

use crate::api::allocator::{Allocator, AllocatorKind};
use crate::api::config::AllocConfig;
use crate::api::error::AllocError;
use crate::api::stats::AllocStats;

/// A per-frame arena plus a persistent free list.
///
/// # Example
///
/// ```rust
/// use scopealloc::{AllocConfig, MemoryScope, Scopes};
///
/// let mut scopes = Scopes::new(&AllocConfig::minimal()).unwrap();
///
/// // Long-lived: freed explicitly.
/// let glyphs = scopes.persistent().alloc_array::<u8>(1024).unwrap();
///
/// scopes.begin_frame();
/// let file = scopes.frame().allocate(4096, 16).unwrap();
/// // ... decode `file` into `glyphs` ...
/// scopes.end_frame(); // `file` is gone
///
/// unsafe { scopes.persistent().deallocate(glyphs.as_ptr()) };
/// ```
#[derive(Debug)]
pub struct Scopes {
    frame: Allocator,
    persistent: Allocator,
    frame_number: u64,
    in_frame: bool,
}

impl Scopes {
    /// Create both scopes from a config.
    pub fn new(config: &AllocConfig) -> Result<Self, AllocError> {
        let frame = Allocator::with_kind(AllocatorKind::Arena, config.frame_arena_size, config.backing_init)?;
        let persistent =
            Allocator::with_kind(AllocatorKind::FreeList, config.persistent_size, config.backing_init)?;

        log::debug!(
            target: "scopealloc",
            "scopes created (frame {} bytes, persistent {} bytes)",
            config.frame_arena_size,
            config.persistent_size
        );

        Ok(Self {
            frame,
            persistent,
            frame_number: 0,
            in_frame: false,
        })
    }

    /// Start a frame.
    pub fn begin_frame(&mut self) {
        if self.in_frame {
            log::warn!(target: "scopealloc", "begin_frame called twice without end_frame (frame {})", self.frame_number);
        }
        self.in_frame = true;
    }

    /// Finish a frame, releasing all frame allocations.
    pub fn end_frame(&mut self) {
        self.frame.reset();
        self.frame_number += 1;
        self.in_frame = false;
    }

    /// Completed frames.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Whether `begin_frame` was called without a matching `end_frame`.
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Transient memory, reclaimed at `end_frame`.
    pub fn frame(&mut self) -> &mut Allocator {
        &mut self.frame
    }

    /// Long-lived memory, freed per allocation.
    pub fn persistent(&mut self) -> &mut Allocator {
        &mut self.persistent
    }

    /// Both scopes at once, for loaders that need a temporary buffer and a
    /// destination.
    pub fn split(&mut self) -> (&mut Allocator, &mut Allocator) {
        (&mut self.frame, &mut self.persistent)
    }

    /// Telemetry for (frame, persistent).
    pub fn stats(&self) -> (AllocStats, AllocStats) {
        (self.frame.stats(), self.persistent.stats())
    }

    /// Release both backing buffers.
    pub fn destroy(self) {
        self.frame.destroy();
        self.persistent.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::allocator::MemoryScope;

    #[test]
    fn test_end_frame_resets_frame_scope() {
        let mut scopes = Scopes::new(&AllocConfig::minimal()).unwrap();

        scopes.begin_frame();
        let first = scopes.frame().allocate(128, 16).unwrap();
        assert!(scopes.in_frame());
        scopes.end_frame();

        scopes.begin_frame();
        let second = scopes.frame().allocate(128, 16).unwrap();
        scopes.end_frame();

        assert_eq!(first, second);
        assert_eq!(scopes.frame_number(), 2);
        assert_eq!(scopes.stats().0.reset_count, 2);
    }

    #[test]
    fn test_persistent_survives_frames() {
        let mut scopes = Scopes::new(&AllocConfig::minimal()).unwrap();
        let kept = scopes.persistent().alloc_value(7u32).unwrap();

        for _ in 0..3 {
            scopes.begin_frame();
            scopes.frame().allocate(1024, 8).unwrap();
            scopes.end_frame();
        }

        unsafe {
            assert_eq!(*kept.as_ptr(), 7);
            scopes.persistent().deallocate(kept.as_ptr().cast());
        }
        assert_eq!(scopes.stats().1.used, 0);
    }

    #[test]
    fn test_split_borrows_both() {
        let mut scopes = Scopes::new(&AllocConfig::minimal()).unwrap();
        let (frame, persistent) = scopes.split();

        let temp = frame.allocate(256, 8).unwrap();
        let dest = persistent.allocate(256, 8).unwrap();
        unsafe {
            std::ptr::copy_nonoverlapping(temp.as_ptr(), dest.as_ptr(), 256);
            persistent.deallocate(dest.as_ptr());
        }
        scopes.destroy();
    }

    #[test]
    fn test_kinds() {
        let mut scopes = Scopes::new(&AllocConfig::minimal()).unwrap();
        assert_eq!(scopes.frame().kind(), AllocatorKind::Arena);
        assert_eq!(scopes.persistent().kind(), AllocatorKind::FreeList);
    }
}
