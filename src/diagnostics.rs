//! Location-anchored diagnostic sink, built around a plain `eprintln!` +
//! `process::exit(1)` idiom rather than a `Result`-propagating error type.
//!
//! Every later stage (lexer, parser, type layer, IR builder) reports through
//! a `&Diagnostics` rather than panicking or returning ad-hoc strings, so
//! that location formatting and the fatal-exit protocol stay in one place.
//! A `fatal` call never returns: it prints and terminates the process, so a
//! partially-built AST is never handed to the next stage.

use crate::location::Location;
use std::cell::Cell;

/// Severity of a non-fatal diagnostic. Fatal diagnostics have no `Severity`
/// value because they never coexist with continued compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
}

/// Sink for diagnostics produced during one compilation unit.
///
/// `warning_count` lets the driver report a summary; it never affects the
/// process exit status.
pub struct Diagnostics {
    warning_count: Cell<u32>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics {
            warning_count: Cell::new(0),
        }
    }

    /// Emit a non-fatal warning and continue.
    pub fn warning(&self, loc: Location, message: impl std::fmt::Display) {
        self.warning_count.set(self.warning_count.get() + 1);
        eprintln!("{}: warning: {}", loc, message);
    }

    /// Emit a fatal diagnostic and terminate the process with status 1.
    ///
    /// This is the *only* sanctioned way later stages fail: no stage
    /// returns a partially valid AST/type/IR result after an error.
    pub fn fatal(&self, loc: Location, message: impl std::fmt::Display) -> ! {
        eprintln!("{}: error: {}", loc, message);
        std::process::exit(1);
    }

    /// Emit a fatal diagnostic that additionally points at a second,
    /// related location (e.g. resolution errors reporting both the new and
    /// the previous declaration).
    pub fn fatal_with_note(
        &self,
        loc: Location,
        message: impl std::fmt::Display,
        note_loc: Location,
        note: impl std::fmt::Display,
    ) -> ! {
        eprintln!("{}: error: {}", loc, message);
        eprintln!("{}: note: {}", note_loc, note);
        std::process::exit(1);
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::Interner;

    #[test]
    fn warnings_do_not_abort() {
        let interner = Interner::new();
        let file = interner.intern("a.abc");
        let diags = Diagnostics::new();
        diags.warning(Location::point(file, crate::location::Position::start()), "test");
        assert_eq!(diags.warning_count(), 1);
    }
}
