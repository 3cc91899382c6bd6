//! # scopealloc
//!
//! Fixed-capacity memory scopes for game prototypes.
//!
//! ## Features
//!
//! - Arena: bump allocation, bulk reset per frame
//! - Free list: first-fit allocation with per-block free and immediate
//!   coalescing, for long-lived assets
//! - One `Allocator` facade and a `MemoryScope` trait over both
//! - Nested arena scopes and marks for speculative allocation
//! - Typed failures instead of aborts, with optional fail-fast strict mode
//! - Coded diagnostics through the `log` facade
//! - `std::alloc::Allocator` adapters (`nightly` feature)
//!
//! Scopes are single-threaded: each one owns its backing buffer and is
//! neither `Send` nor `Sync`.
//!
//! ## Quick Start
//!
//! ```rust
//! use scopealloc::{AllocConfig, MemoryScope, Scopes};
//!
//! let mut scopes = Scopes::new(&AllocConfig::minimal()).unwrap();
//!
//! // Game loop
//! scopes.begin_frame();
//! let temp = scopes.frame().alloc::<[f32; 256]>().unwrap();
//! // ... use temp ...
//! scopes.end_frame();
//! ```

#![cfg_attr(feature = "nightly", feature(allocator_api))]

pub mod api;
pub mod diagnostics;
pub mod util;

mod allocators;

#[cfg(feature = "debug")]
pub mod debug;

// Re-export public API at crate root for convenience
pub use allocators::arena::Arena;
pub use allocators::backing::BackingInit;
pub use allocators::free_list::{FreeList, FreeRegion, MIN_ALIGN, MIN_BLOCK_SIZE};

pub use api::allocator::{Allocator, AllocatorKind, MemoryScope};
pub use api::config::AllocConfig;
pub use api::error::AllocError;
pub use api::scope::{ArenaMark, ArenaScope};
pub use api::scopes::Scopes;
pub use api::stats::AllocStats;

// Allocator trait implementations (nightly only)
#[cfg(feature = "nightly")]
pub use api::allocator_impl::{ArenaAllocator, FreeListAllocator};

pub use diagnostics::{set_strict_mode, Diagnostic, DiagnosticKind, StrictMode, StrictModeGuard};
pub use util::size::{format_bytes, gb, kb, mb};
