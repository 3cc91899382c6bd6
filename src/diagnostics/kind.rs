//! Diagnostic kinds and core types.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - something is definitely wrong.
    Error,
    /// A warning - something is probably wrong or suboptimal.
    Warning,
    /// Additional context about another diagnostic.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }

    /// Matching `log` level.
    pub fn log_level(&self) -> log::Level {
        match self {
            DiagnosticKind::Error => log::Level::Error,
            DiagnosticKind::Warning => log::Level::Warn,
            DiagnosticKind::Note => log::Level::Info,
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `SA0xx` - Arena issues
/// - `SA1xx` - Free list issues
/// - `SA2xx` - Backing buffer / construction issues
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "SA001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// Arena (SA0xx)
// =============================================================================

/// SA001: Arena exhausted.
pub const SA001: Diagnostic = Diagnostic::warning(
    "SA001",
    "arena exhausted, allocation failed"
).with_note("the bump cursor plus alignment padding would run past the arena capacity")
 .with_help("increase frame_arena_size in AllocConfig, or reset the arena more often");

/// SA002: Stale arena mark.
pub const SA002: Diagnostic = Diagnostic::error(
    "SA002",
    "arena mark is stale, rewind ignored"
).with_note("the arena was reset, or rewound below this mark, after the mark was taken")
 .with_help("restore marks in the reverse order they were taken, within one frame");

// =============================================================================
// Free list (SA1xx)
// =============================================================================

/// SA101: Free list exhausted.
pub const SA101: Diagnostic = Diagnostic::warning(
    "SA101",
    "free list exhausted, allocation failed"
).with_note("fewer free bytes remain than the request needs")
 .with_help("increase persistent_size in AllocConfig, or free unused assets");

/// SA102: Free list fragmented.
pub const SA102: Diagnostic = Diagnostic::warning(
    "SA102",
    "no free block is large enough, although total free space is"
).with_note("live allocations split the free space into blocks smaller than the request")
 .with_help("free long-lived allocations in bulk, or load large assets first");

/// SA103: Foreign pointer.
pub const SA103: Diagnostic = Diagnostic::error(
    "SA103",
    "deallocated pointer does not belong to this free list"
).with_note("the pointer lies outside the backing buffer")
 .with_help("return memory to the scope it was allocated from");

/// SA104: Double free or corrupted header.
pub const SA104: Diagnostic = Diagnostic::error(
    "SA104",
    "double free or corrupted allocation header"
).with_note("the block overlaps memory that is already free, or its header is out of bounds")
 .with_help("make sure each allocation is deallocated exactly once and not written past its end");

/// SA105: Live allocations at destroy.
pub const SA105: Diagnostic = Diagnostic::warning(
    "SA105",
    "free list destroyed with live allocations"
).with_note("memory handed out by this scope was never returned")
 .with_help("deallocate every allocation before destroying the scope, or enable the `debug` feature for backtraces");

// =============================================================================
// Construction (SA2xx)
// =============================================================================

/// SA201: Backing buffer acquisition failed.
pub const SA201: Diagnostic = Diagnostic::error(
    "SA201",
    "failed to acquire backing buffer"
).with_note("the system allocator returned null")
 .with_help("reduce the configured capacities");

/// SA202: Capacity too small.
pub const SA202: Diagnostic = Diagnostic::error(
    "SA202",
    "capacity too small for allocator bookkeeping"
).with_note("a free list needs room for at least one free node")
 .with_help("use a capacity large enough for a free node plus the largest expected allocation");
