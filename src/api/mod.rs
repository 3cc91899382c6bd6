//! Public API for scopealloc.
//!
//! This module contains all user-facing types and functions.
//! Most users should only interact with types from this module.

pub mod allocator;
#[cfg(feature = "nightly")]
pub mod allocator_impl;
pub mod config;
pub mod error;
pub mod scope;
pub mod scopes;
pub mod stats;
