//! Source locations shared by every later compiler stage.
//!
//! The reader is the only component that manufactures [`Location`] values;
//! everything downstream treats them as opaque.

use crate::strings::Sym;
use std::fmt;

/// Tab stop width used when advancing columns across a `\t` character.
pub const TAB_WIDTH: usize = 8;

/// A single position in a source file: 1-indexed line and column.
///
/// Columns advance tab-aligned to an 8-wide stop, matching the reader's
/// column accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn start() -> Self {
        Position { line: 1, column: 1 }
    }
}

/// A half-open span `[start, end)` within a single file, identified by an
/// interned path handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: Sym,
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(file: Sym, start: Position, end: Position) -> Self {
        Location { file, start, end }
    }

    /// A zero-width location at `pos`, used for synthesized tokens/nodes
    /// (e.g. compiler-generated constructor bodies) that still need a home
    /// for diagnostics.
    pub fn point(file: Sym, pos: Position) -> Self {
        Location { file, start: pos, end: pos }
    }

    /// A location with no useful file info, for nodes built entirely by the
    /// compiler (e.g. implicit casts) that should never themselves be the
    /// anchor of a diagnostic.
    pub fn synthetic() -> Self {
        Location {
            file: Sym::empty(),
            start: Position::start(),
            end: Position::start(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(
                f,
                "{}:{}:{}",
                self.file.as_str(),
                self.start.line,
                self.start.column
            )
        } else {
            write!(
                f,
                "{}:{}:{}-{}:{}",
                self.file.as_str(),
                self.start.line,
                self.start.column,
                self.end.line,
                self.end.column
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::Interner;

    #[test]
    fn point_location_has_zero_width() {
        let interner = Interner::new();
        let file = interner.intern("a.abc");
        let loc = Location::point(file, Position { line: 3, column: 5 });
        assert_eq!(loc.start, loc.end);
    }

    #[test]
    fn display_single_line_span() {
        let interner = Interner::new();
        let file = interner.intern("a.abc");
        let loc = Location::new(
            file,
            Position { line: 1, column: 1 },
            Position { line: 1, column: 1 },
        );
        assert_eq!(format!("{}", loc), "a.abc:1:1");
    }
}
