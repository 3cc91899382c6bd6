//! Diagnostic emission backend.
//!
//! Every diagnostic goes to the `log` facade under the `scopealloc` target.
//! With the `diagnostics` feature it is also echoed to stderr in rustc style.

use std::cell::Cell;

use super::kind::Diagnostic;
use super::strict::strict_mode;

const LOG_TARGET: &str = "scopealloc";

thread_local! {
    static SUPPRESSED: Cell<bool> = const { Cell::new(false) };
}

/// Suppress diagnostic output on the current thread.
///
/// Strict mode still panics while output is suppressed.
pub fn suppress_diagnostics(suppress: bool) {
    SUPPRESSED.with(|s| s.set(suppress));
}

/// Check if diagnostics are suppressed on the current thread.
pub fn is_suppressed() -> bool {
    SUPPRESSED.with(|s| s.get())
}

/// Emit a diagnostic.
pub fn emit(diag: &Diagnostic) {
    if !is_suppressed() {
        emit_to_log(diag, None);

        #[cfg(feature = "diagnostics")]
        emit_to_stderr(diag, None);
    }

    enforce_strict_mode(diag, None);
}

/// Emit a diagnostic with additional runtime context.
pub fn emit_with_context(diag: &Diagnostic, context: &str) {
    if !is_suppressed() {
        emit_to_log(diag, Some(context));

        #[cfg(feature = "diagnostics")]
        emit_to_stderr(diag, Some(context));
    }

    enforce_strict_mode(diag, Some(context));
}

fn enforce_strict_mode(diag: &Diagnostic, context: Option<&str>) {
    let fatal = strict_mode().is_fatal(diag.kind);

    if fatal {
        panic!(
            "[scopealloc][{}] {}\nContext: {}\nStrict mode enabled - diagnostics are fatal.",
            diag.code,
            diag.message,
            context.unwrap_or("none")
        );
    }
}

fn emit_to_log(diag: &Diagnostic, context: Option<&str>) {
    let level = diag.kind.log_level();
    match context {
        Some(ctx) => log::log!(target: LOG_TARGET, level, "[{}] {} ({})", diag.code, diag.message, ctx),
        None => log::log!(target: LOG_TARGET, level, "[{}] {}", diag.code, diag.message),
    }

    if let Some(help) = diag.help {
        log::debug!(target: LOG_TARGET, "  help: {}", help);
    }
}

#[cfg(feature = "diagnostics")]
fn emit_to_stderr(diag: &Diagnostic, context: Option<&str>) {
    eprintln!("[scopealloc][{}] {}: {}", diag.code, diag.kind.prefix(), diag.message);

    if let Some(ctx) = context {
        eprintln!("  context: {}", ctx);
    }
    if let Some(note) = diag.note {
        eprintln!("  note: {}", note);
    }
    if let Some(help) = diag.help {
        eprintln!("  help: {}", help);
    }

    eprintln!();
}
