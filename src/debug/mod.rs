//! Debug utilities for catching misuse of scopes.
//!
//! Only compiled when the `debug` feature is enabled.

pub(crate) mod backtrace;
pub(crate) mod poison;

pub use self::backtrace::{AllocationTrace, AllocationTracker};
pub use self::poison::{is_poisoned, FREED_PATTERN, RESET_PATTERN};
