//! Allocator diagnostics.
//!
//! This module provides:
//! - **Coded diagnostics**: allocator-aware messages with notes and help
//! - **Emission**: through the `log` facade, optionally echoed to stderr
//! - **Strict mode**: optional panic-on-diagnostic for fail-fast builds and CI
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                          |
//! |-------|----------------------------------|
//! | SA0xx | Arena issues                     |
//! | SA1xx | Free list issues                 |
//! | SA2xx | Backing buffer / construction    |
//!
//! ## Usage
//!
//! ```rust
//! use scopealloc::diagnostics::{set_strict_mode, StrictMode};
//!
//! // Exhaustion now panics instead of returning Err.
//! set_strict_mode(StrictMode::PanicOnWarning);
//! # set_strict_mode(StrictMode::Warn);
//! ```

pub mod emit;
pub mod kind;
pub mod strict;

pub use emit::{emit, emit_with_context, is_suppressed, suppress_diagnostics};
pub use kind::{Diagnostic, DiagnosticKind};
pub use strict::{init_from_env, set_strict_mode, strict_mode, StrictMode, StrictModeGuard};

pub use kind::{SA001, SA002, SA101, SA102, SA103, SA104, SA105, SA201, SA202};
