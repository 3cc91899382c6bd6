//! Scope configuration.

use crate::allocators::backing::BackingInit;
use crate::util::size::{kb, mb};

/// Capacities and initialization policy for a frame/persistent scope pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocConfig {
    /// Size of the per-frame arena (default: 16 MB)
    pub frame_arena_size: usize,

    /// Size of the persistent free list (default: 64 MB)
    pub persistent_size: usize,

    /// How backing buffers are initialized (default: uninitialized)
    pub backing_init: BackingInit,
}

impl Default for AllocConfig {
    fn default() -> Self {
        Self {
            frame_arena_size: mb(16),
            persistent_size: mb(64),
            backing_init: BackingInit::Uninit,
        }
    }
}

impl AllocConfig {
    /// Create a minimal config for testing or constrained environments.
    pub fn minimal() -> Self {
        Self {
            frame_arena_size: kb(64),
            persistent_size: kb(256),
            backing_init: BackingInit::Zeroed,
        }
    }

    /// Create a config for asset-heavy scenes.
    pub fn high_capacity() -> Self {
        Self {
            frame_arena_size: mb(64),
            persistent_size: mb(512),
            backing_init: BackingInit::Uninit,
        }
    }

    /// Builder pattern: set frame arena size.
    pub fn with_frame_arena_size(mut self, size: usize) -> Self {
        self.frame_arena_size = size;
        self
    }

    /// Builder pattern: set persistent free list size.
    pub fn with_persistent_size(mut self, size: usize) -> Self {
        self.persistent_size = size;
        self
    }

    /// Builder pattern: choose backing buffer initialization.
    pub fn with_backing_init(mut self, init: BackingInit) -> Self {
        self.backing_init = init;
        self
    }

    /// Total bytes the two backing buffers will take.
    pub fn total_size(&self) -> usize {
        self.frame_arena_size.saturating_add(self.persistent_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = AllocConfig::minimal()
            .with_frame_arena_size(kb(8))
            .with_persistent_size(kb(32))
            .with_backing_init(BackingInit::Uninit);

        assert_eq!(config.frame_arena_size, 8192);
        assert_eq!(config.persistent_size, 32768);
        assert_eq!(config.backing_init, BackingInit::Uninit);
        assert_eq!(config.total_size(), 40960);
    }

    #[test]
    fn test_presets_are_ordered() {
        let minimal = AllocConfig::minimal();
        let default = AllocConfig::default();
        let high = AllocConfig::high_capacity();

        assert!(minimal.total_size() < default.total_size());
        assert!(default.total_size() < high.total_size());
    }
}
