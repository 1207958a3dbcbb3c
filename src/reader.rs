//! Multi-file stacked character reader.
//!
//! The reader owns a stack of input sources. `next_ch()` advances one
//! character, counting tabs to the next 8-column stop and advancing the
//! line on newline. At EOF of a nested source, the reader pops and resumes
//! the parent. Include-path search and include-once bookkeeping live in
//! [`Reader`] because both the lexer's `@include` handling and the driver's
//! dependency-file writer (`-MD`) need the same "files actually opened"
//! record.

use crate::location::{Position, TAB_WIDTH};
use crate::strings::{Interner, Sym};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

struct Source {
    path: Sym,
    chars: Vec<char>,
    idx: usize,
    pos: Position,
}

impl Source {
    fn new(path: Sym, text: &str) -> Self {
        Source {
            path,
            chars: text.chars().collect(),
            idx: 0,
            pos: Position::start(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.idx + 1).copied()
    }

    /// Advance one character, updating line/column per the tab-aligned
    /// stop rule, and return the character consumed.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.idx += 1;
        match c {
            '\n' => {
                self.pos.line += 1;
                self.pos.column = 1;
            }
            '\t' => {
                let col0 = self.pos.column - 1;
                let next_stop = (col0 / TAB_WIDTH as u32 + 1) * TAB_WIDTH as u32;
                self.pos.column = next_stop + 1;
            }
            _ => {
                self.pos.column += 1;
            }
        }
        Some(c)
    }
}

/// Multi-file character stream with include-path search and include-once
/// semantics.
pub struct Reader {
    interner: Rc<Interner>,
    stack: Vec<Source>,
    include_dirs: Vec<PathBuf>,
    /// Canonical paths of files already opened via `@include`, so a second
    /// `@include` of the same file is silently skipped.
    included: HashSet<PathBuf>,
    /// Every file actually opened, in open order — consumed by the
    /// dependency-file writer.
    opened_files: Vec<PathBuf>,
}

/// Why an `@include` failed to open; distinguishes "use include-once
/// skip" from "hard I/O error" for the lexer.
pub enum IncludeOutcome {
    Opened,
    AlreadyIncluded,
    NotFound,
}

impl Reader {
    pub fn new(interner: Rc<Interner>, include_dirs: Vec<PathBuf>) -> Self {
        Reader {
            interner,
            stack: Vec::new(),
            include_dirs,
            included: HashSet::new(),
            opened_files: Vec::new(),
        }
    }

    /// Open the root compilation-unit file. Must be called before any
    /// `next_ch()`.
    pub fn open_root(&mut self, path: &Path) -> Result<(), String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("cannot open '{}': {}", path.display(), e))?;
        let canon = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.included.insert(canon.clone());
        self.opened_files.push(canon);
        let sym = self.interner.intern(&path.display().to_string());
        self.stack.push(Source::new(sym, &text));
        Ok(())
    }

    /// Resolve and push an `@"file"` / `@<file>` include. `bracketed`
    /// selects include-path search (`@<file>`) over a path relative to
    /// `current_dir` (`@"file"`).
    pub fn open_include(
        &mut self,
        name: &str,
        bracketed: bool,
        current_dir: &Path,
    ) -> IncludeOutcome {
        let candidate = if bracketed {
            let mut found = None;
            for dir in &self.include_dirs {
                let p = dir.join(name);
                if p.is_file() {
                    found = Some(p);
                    break;
                }
            }
            match found {
                Some(p) => p,
                None => return IncludeOutcome::NotFound,
            }
        } else {
            let p = current_dir.join(name);
            if !p.is_file() {
                return IncludeOutcome::NotFound;
            }
            p
        };

        let canon = candidate
            .canonicalize()
            .unwrap_or_else(|_| candidate.clone());
        if self.included.contains(&canon) {
            return IncludeOutcome::AlreadyIncluded;
        }
        let text = match fs::read_to_string(&candidate) {
            Ok(t) => t,
            Err(_) => return IncludeOutcome::NotFound,
        };
        self.included.insert(canon.clone());
        self.opened_files.push(canon);
        let sym = self.interner.intern(&candidate.display().to_string());
        self.stack.push(Source::new(sym, &text));
        IncludeOutcome::Opened
    }

    /// The directory of the currently active source file, used to resolve
    /// a subsequent relative `@"file"` include.
    pub fn current_dir(&self) -> PathBuf {
        self.current_path()
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default()
    }

    pub fn current_path(&self) -> PathBuf {
        self.stack
            .last()
            .map(|s| PathBuf::from(s.path.as_str()))
            .unwrap_or_default()
    }

    pub fn current_file_sym(&self) -> Sym {
        self.stack
            .last()
            .map(|s| s.path.clone())
            .unwrap_or_else(Sym::empty)
    }

    pub fn current_pos(&self) -> Position {
        self.stack.last().map(|s| s.pos).unwrap_or(Position::start())
    }

    pub fn opened_files(&self) -> &[PathBuf] {
        &self.opened_files
    }

    /// Advance one character, popping exhausted nested sources and
    /// resuming the parent. Returns `None` only once every
    /// source on the stack, including the root, is exhausted.
    pub fn next_ch(&mut self) -> Option<char> {
        loop {
            match self.stack.last_mut() {
                None => return None,
                Some(top) => {
                    if let Some(c) = top.advance() {
                        return Some(c);
                    }
                    self.stack.pop();
                }
            }
        }
    }

    pub fn peek_ch(&self) -> Option<char> {
        self.stack.last().and_then(|s| s.peek())
    }

    pub fn peek_ch2(&self) -> Option<char> {
        self.stack.last().and_then(|s| s.peek2())
    }

    pub fn at_eof(&self) -> bool {
        self.stack.iter().all(|s| s.idx >= s.chars.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_over(text: &str) -> (Reader, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root.abc");
        std::fs::write(&path, text).unwrap();
        let mut r = Reader::new(Rc::new(Interner::new()), vec![]);
        r.open_root(&path).unwrap();
        (r, dir)
    }

    #[test]
    fn tab_advances_to_next_eight_column_stop() {
        let (mut r, _dir) = reader_over("\tx");
        r.next_ch(); // consume the tab
        assert_eq!(r.current_pos().column, 9);
    }

    #[test]
    fn newline_advances_line_and_resets_column() {
        let (mut r, _dir) = reader_over("a\nb");
        r.next_ch();
        r.next_ch();
        assert_eq!(r.current_pos().line, 2);
        assert_eq!(r.current_pos().column, 1);
    }

    #[test]
    fn include_once_is_silently_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let inc = dir.path().join("b.abc");
        std::fs::write(&inc, "global g: i32;").unwrap();
        let root = dir.path().join("a.abc");
        std::fs::write(&root, "").unwrap();
        let mut r = Reader::new(Rc::new(Interner::new()), vec![]);
        r.open_root(&root).unwrap();
        assert!(matches!(
            r.open_include("b.abc", false, &dir.path().to_path_buf()),
            IncludeOutcome::Opened
        ));
        // pop the pushed source back off by draining it
        while r.next_ch().is_some() {}
        assert!(matches!(
            r.open_include("b.abc", false, &dir.path().to_path_buf()),
            IncludeOutcome::AlreadyIncluded
        ));
    }

    #[test]
    fn exhausting_nested_source_resumes_parent() {
        let dir = tempfile::tempdir().unwrap();
        let inc = dir.path().join("b.abc");
        std::fs::write(&inc, "Q").unwrap();
        let root = dir.path().join("a.abc");
        std::fs::write(&root, "P").unwrap();
        let mut r = Reader::new(Rc::new(Interner::new()), vec![]);
        r.open_root(&root).unwrap();
        assert_eq!(r.next_ch(), Some('P'));
        r.open_include("b.abc", false, &dir.path().to_path_buf());
        assert_eq!(r.next_ch(), Some('Q'));
        assert_eq!(r.next_ch(), None);
    }
}
