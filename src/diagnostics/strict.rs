//! Fail-fast switch for allocator diagnostics.
//!
//! Scopes report exhaustion and misuse as `Err` values plus a diagnostic.
//! Strict mode escalates the diagnostic itself into a panic, for games that
//! would rather crash on the first exhausted arena than limp along:
//!
//! | Mode             | Panics on                                               |
//! |------------------|---------------------------------------------------------|
//! | `Warn`           | nothing                                                 |
//! | `PanicOnError`   | SA002, SA103, SA104, SA201, SA202 (misuse, bad setup)   |
//! | `PanicOnWarning` | also SA001, SA101, SA102, SA105 (exhaustion, leaks)     |
//!
//! The mode is per thread, matching the scopes, which never cross threads.

use std::cell::Cell;

use super::kind::DiagnosticKind;

/// How diagnostics are escalated on the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrictMode {
    /// Log only; allocation failures surface as `Err`.
    #[default]
    Warn,
    /// Panic on misuse and failed construction.
    PanicOnError,
    /// Also panic on exhaustion, fragmentation and leaks.
    PanicOnWarning,
}

impl StrictMode {
    /// Parse a `SCOPEALLOC_STRICT` value.
    ///
    /// Unknown values fall back to `Warn`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "1" | "error" | "true" => StrictMode::PanicOnError,
            "2" | "warning" | "all" => StrictMode::PanicOnWarning,
            _ => StrictMode::Warn,
        }
    }

    /// Whether a diagnostic of `kind` panics under this mode.
    pub fn is_fatal(self, kind: DiagnosticKind) -> bool {
        match kind {
            DiagnosticKind::Error => self != StrictMode::Warn,
            DiagnosticKind::Warning => self == StrictMode::PanicOnWarning,
            DiagnosticKind::Note => false,
        }
    }
}

thread_local! {
    static STRICT_MODE: Cell<StrictMode> = const { Cell::new(StrictMode::Warn) };
}

/// Set the strict mode for the current thread.
pub fn set_strict_mode(mode: StrictMode) {
    STRICT_MODE.with(|m| m.set(mode));
}

/// The current thread's strict mode.
pub fn strict_mode() -> StrictMode {
    STRICT_MODE.with(|m| m.get())
}

/// Switches strict mode for the guard's lifetime, then restores the
/// previous mode. Useful around a single load or a single test.
///
/// ```rust
/// use scopealloc::{Arena, StrictModeGuard};
///
/// let mut arena = Arena::new(64).unwrap();
/// {
///     let _strict = StrictModeGuard::panic_on_error();
///     arena.allocate(32, 8).unwrap();
/// }
/// // Back to returning Err on exhaustion.
/// assert!(arena.allocate(64, 8).is_err());
/// ```
pub struct StrictModeGuard {
    previous: StrictMode,
}

impl StrictModeGuard {
    /// Enter `mode` until the guard drops.
    pub fn new(mode: StrictMode) -> Self {
        let previous = strict_mode();
        set_strict_mode(mode);
        Self { previous }
    }

    /// Panic on misuse until the guard drops.
    pub fn panic_on_error() -> Self {
        Self::new(StrictMode::PanicOnError)
    }

    /// Panic on misuse and exhaustion until the guard drops.
    pub fn panic_on_warning() -> Self {
        Self::new(StrictMode::PanicOnWarning)
    }
}

impl Drop for StrictModeGuard {
    fn drop(&mut self) {
        set_strict_mode(self.previous);
    }
}

/// Apply `SCOPEALLOC_STRICT` to the current thread, if set.
///
/// Accepts `0`/`warn`, `1`/`error`, `2`/`warning`. Call once at startup on
/// the thread that owns the scopes.
pub fn init_from_env() {
    if let Ok(val) = std::env::var("SCOPEALLOC_STRICT") {
        set_strict_mode(StrictMode::parse(&val));
    }
}
