//! Raw tokenizer plus the token-level macro preprocessor layered on top of
//! it.
//!
//! Three things happen, in order, every time [`Lexer::next_token`] is
//! asked for a token:
//!
//! 1. If a macro expansion is being rescanned, the next token comes from
//!    there instead of the underlying [`Reader`].
//! 2. Otherwise a token is scanned directly off the character stream.
//!    `@define` / `@ifdef` / `@endif` / `@include` are recognized here,
//!    consumed, and never themselves surface as tokens.
//! 3. If the scanned token is an identifier naming an active macro, its
//!    replacement list is pushed as a new rescan buffer and step 1 applies
//!    on the next call; a per-expansion hideset stops a macro from
//!    expanding itself (directly or through another macro) forever.

use crate::diagnostics::Diagnostics;
use crate::location::{Location, Position};
use crate::reader::{IncludeOutcome, Reader};
use crate::strings::{Interner, Sym};
use crate::token::{Token, TokenKind};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

struct Expansion {
    tokens: Vec<Token>,
    pos: usize,
    hideset: Rc<HashSet<String>>,
}

pub struct Lexer {
    reader: Reader,
    interner: Rc<Interner>,
    diags: Rc<Diagnostics>,
    macros: HashMap<String, Vec<Token>>,
    expansions: Vec<Expansion>,
    /// Number of `@ifdef` blocks currently open because their condition
    /// was true (and so were *not* skipped by [`Lexer::handle_ifdef`]).
    /// Their `@endif` still has to flow through `handle_directive`, where
    /// it's matched against this counter instead of being treated as
    /// dangling. Checked against zero at end-of-input too, so a taken
    /// `@ifdef` missing its `@endif` is diagnosed the same way the skip
    /// branch already diagnoses its own unterminated scan.
    open_taken_ifdefs: u32,
}

impl Lexer {
    pub fn new(reader: Reader, interner: Rc<Interner>, diags: Rc<Diagnostics>) -> Self {
        Lexer {
            reader,
            interner,
            diags,
            macros: HashMap::new(),
            expansions: Vec::new(),
            open_taken_ifdefs: 0,
        }
    }

    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    fn make_token(&self, kind: TokenKind, start_file: Sym, start: Position, raw: &str, cooked: &str) -> Token {
        let loc = Location::new(start_file, start, self.reader.current_pos());
        Token::new(loc, kind, self.interner.intern(raw), self.interner.intern(cooked))
    }

    /// Public entry point: returns the next token, fully macro-expanded,
    /// with directives already consumed.
    pub fn next_token(&mut self) -> Token {
        loop {
            let tok = self.next_token_no_expand();
            if tok.kind == TokenKind::Ident {
                let name = tok.text().to_string();
                if self.macros.contains_key(&name) && !self.hidden(&name) {
                    self.push_expansion(&name);
                    continue;
                }
            }
            return tok;
        }
    }

    fn hidden(&self, name: &str) -> bool {
        self.expansions
            .last()
            .map(|e| e.hideset.contains(name))
            .unwrap_or(false)
    }

    fn push_expansion(&mut self, name: &str) {
        let replacement = self.macros.get(name).cloned().unwrap_or_default();
        let mut hideset: HashSet<String> = self
            .expansions
            .last()
            .map(|e| (*e.hideset).clone())
            .unwrap_or_default();
        hideset.insert(name.to_string());
        self.expansions.push(Expansion {
            tokens: replacement,
            pos: 0,
            hideset: Rc::new(hideset),
        });
    }

    /// One token, from a rescan buffer if one is active and non-empty,
    /// otherwise scanned fresh. Directive lines are processed and looped
    /// past here, never returned to the caller.
    fn next_token_no_expand(&mut self) -> Token {
        loop {
            if let Some(top) = self.expansions.last_mut() {
                if top.pos < top.tokens.len() {
                    let tok = top.tokens[top.pos].clone();
                    top.pos += 1;
                    return tok;
                }
                self.expansions.pop();
                continue;
            }
            match self.scan_raw() {
                RawOrDirective::Token(t) => return t,
                RawOrDirective::Consumed => continue,
            }
        }
    }

    // ---- raw scanning ----------------------------------------------------

    fn peek(&self) -> Option<char> {
        self.reader.peek_ch()
    }
    fn peek2(&self) -> Option<char> {
        self.reader.peek_ch2()
    }
    fn bump(&mut self) -> Option<char> {
        self.reader.next_ch()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c == ' ' || c == '\t' || c == '\r' || c == '\n' => {
                    self.bump();
                }
                Some('/') if self.peek2() == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                Some('/') if self.peek2() == Some('*') => {
                    let start_file = self.reader.current_file_sym();
                    let start = self.reader.current_pos();
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => {
                                let loc = Location::new(start_file, start, self.reader.current_pos());
                                self.diags.fatal(loc, "unterminated block comment");
                            }
                            Some('*') if self.peek2() == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn scan_raw(&mut self) -> RawOrDirective {
        self.skip_whitespace_and_comments();
        let start_file = self.reader.current_file_sym();
        let start = self.reader.current_pos();
        let c = match self.peek() {
            None => {
                if self.open_taken_ifdefs != 0 {
                    let loc = Location::new(start_file, start, self.reader.current_pos());
                    self.diags.fatal(loc, "unterminated '@ifdef' (missing '@endif')");
                }
                return RawOrDirective::Token(self.make_token(TokenKind::Eof, start_file, start, "", ""));
            }
            Some(c) => c,
        };

        if c == '@' {
            self.bump();
            self.handle_directive(start_file, start);
            return RawOrDirective::Consumed;
        }
        if c.is_ascii_digit() {
            return RawOrDirective::Token(self.scan_number(start_file, start));
        }
        if c == '_' || c.is_alphabetic() {
            return RawOrDirective::Token(self.scan_ident(start_file, start));
        }
        if c == '"' {
            return RawOrDirective::Token(self.scan_string(start_file, start));
        }
        if c == '\'' {
            return RawOrDirective::Token(self.scan_char(start_file, start));
        }
        RawOrDirective::Token(self.scan_punctuator(start_file, start))
    }

    fn scan_ident(&mut self, start_file: Sym, start: Position) -> Token {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let kind = TokenKind::keyword(&s).unwrap_or(TokenKind::Ident);
        self.make_token(kind, start_file, start, &s, &s)
    }

    fn scan_number(&mut self, start_file: Sym, start: Position) -> Token {
        let mut s = String::new();
        if self.peek() == Some('0') && matches!(self.peek2(), Some('x') | Some('X')) {
            s.push(self.bump().unwrap());
            s.push(self.bump().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                s.push(self.bump().unwrap());
            }
            return self.make_token(TokenKind::HexLiteral, start_file, start, &s, &s);
        }
        if self.peek() == Some('0') && matches!(self.peek2(), Some(c) if c.is_ascii_digit()) {
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                s.push(self.bump().unwrap());
            }
            return self.make_token(TokenKind::OctalLiteral, start_file, start, &s, &s);
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            s.push(self.bump().unwrap());
        }
        if self.peek() == Some('.') && matches!(self.peek2(), Some(c) if c.is_ascii_digit()) {
            s.push(self.bump().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                s.push(self.bump().unwrap());
            }
        }
        self.make_token(TokenKind::IntLiteral, start_file, start, &s, &s)
    }

    /// Cook a single escape sequence after a consumed backslash. Supports
    /// the common single-character escapes, up to three octal digits, and
    /// `\xHH`.
    fn scan_escape(&mut self, start_file: Sym, start: Position) -> char {
        match self.bump() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some('"') => '"',
            Some('a') => '\u{7}',
            Some('b') => '\u{8}',
            Some('f') => '\u{c}',
            Some('v') => '\u{b}',
            Some('x') => {
                let mut v: u32 = 0;
                let mut n = 0;
                while n < 2 {
                    match self.peek() {
                        Some(c) if c.is_ascii_hexdigit() => {
                            v = v * 16 + c.to_digit(16).unwrap();
                            self.bump();
                            n += 1;
                        }
                        _ => break,
                    }
                }
                char::from_u32(v).unwrap_or('\u{fffd}')
            }
            Some(c) if c.is_digit(8) => {
                let mut v = c.to_digit(8).unwrap();
                let mut n = 1;
                while n < 3 {
                    match self.peek() {
                        Some(d) if d.is_digit(8) => {
                            v = v * 8 + d.to_digit(8).unwrap();
                            self.bump();
                            n += 1;
                        }
                        _ => break,
                    }
                }
                char::from_u32(v).unwrap_or('\u{fffd}')
            }
            Some(other) => other,
            None => {
                let loc = Location::new(start_file, start, self.reader.current_pos());
                self.diags.fatal(loc, "unterminated escape sequence");
            }
        }
    }

    fn scan_string(&mut self, start_file: Sym, start: Position) -> Token {
        let mut raw = String::from("\"");
        let mut cooked = String::new();
        self.bump();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    let loc = Location::new(start_file, start, self.reader.current_pos());
                    self.diags.fatal(loc, "unterminated string literal");
                }
                Some('"') => {
                    raw.push('"');
                    self.bump();
                    break;
                }
                Some('\\') => {
                    raw.push('\\');
                    self.bump();
                    cooked.push(self.scan_escape(start_file, start));
                }
                Some(c) => {
                    raw.push(c);
                    cooked.push(c);
                    self.bump();
                }
            }
        }
        self.make_token(TokenKind::StringLiteral, start_file, start, &raw, &cooked)
    }

    fn scan_char(&mut self, start_file: Sym, start: Position) -> Token {
        let mut raw = String::from("'");
        self.bump();
        let cooked_char = match self.peek() {
            Some('\\') => {
                raw.push('\\');
                self.bump();
                self.scan_escape(start_file, start)
            }
            Some(c) => {
                raw.push(c);
                self.bump();
                c
            }
            None => {
                let loc = Location::new(start_file, start, self.reader.current_pos());
                self.diags.fatal(loc, "unterminated character literal");
            }
        };
        match self.peek() {
            Some('\'') => {
                raw.push('\'');
                self.bump();
            }
            _ => {
                let loc = Location::new(start_file, start, self.reader.current_pos());
                self.diags.fatal(loc, "character literal must contain exactly one character");
            }
        }
        let cooked = cooked_char.to_string();
        self.make_token(TokenKind::CharLiteral, start_file, start, &raw, &cooked)
    }

    fn scan_punctuator(&mut self, start_file: Sym, start: Position) -> Token {
        use TokenKind::*;
        macro_rules! one {
            ($kind:expr) => {{
                let c = self.bump().unwrap();
                let s = c.to_string();
                return self.make_token($kind, start_file, start, &s, &s);
            }};
        }
        macro_rules! two {
            ($kind:expr) => {{
                let c1 = self.bump().unwrap();
                let c2 = self.bump().unwrap();
                let s: String = [c1, c2].iter().collect();
                return self.make_token($kind, start_file, start, &s, &s);
            }};
        }
        match (self.peek(), self.peek2()) {
            (Some('.'), Some('.')) => {
                self.bump();
                self.bump();
                if self.peek() == Some('.') {
                    self.bump();
                    return self.make_token(Ellipsis, start_file, start, "...", "...");
                }
                let loc = Location::new(start_file, start, self.reader.current_pos());
                self.diags.fatal(loc, "unexpected '..' (did you mean '...'?)");
            }
            (Some('-'), Some('>')) => two!(Arrow),
            (Some('+'), Some('+')) => two!(PlusPlus),
            (Some('+'), Some('=')) => two!(PlusEq),
            (Some('-'), Some('-')) => two!(MinusMinus),
            (Some('-'), Some('=')) => two!(MinusEq),
            (Some('*'), Some('=')) => two!(StarEq),
            (Some('/'), Some('=')) => two!(SlashEq),
            (Some('%'), Some('=')) => two!(PercentEq),
            (Some('&'), Some('&')) => two!(AmpAmp),
            (Some('&'), Some('=')) => two!(AmpEq),
            (Some('|'), Some('|')) => two!(PipePipe),
            (Some('|'), Some('=')) => two!(PipeEq),
            (Some('^'), Some('=')) => two!(CaretEq),
            (Some('='), Some('=')) => two!(EqEq),
            (Some('!'), Some('=')) => two!(BangEq),
            (Some('<'), Some('=')) => two!(LtEq),
            (Some('>'), Some('=')) => two!(GtEq),
            (Some('<'), Some('<')) => {
                self.bump();
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    return self.make_token(ShlEq, start_file, start, "<<=", "<<=");
                }
                return self.make_token(Shl, start_file, start, "<<", "<<");
            }
            (Some('>'), Some('>')) => {
                self.bump();
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    return self.make_token(ShrEq, start_file, start, ">>=", ">>=");
                }
                return self.make_token(Shr, start_file, start, ">>", ">>");
            }
            (Some('('), _) => one!(LParen),
            (Some(')'), _) => one!(RParen),
            (Some('{'), _) => one!(LBrace),
            (Some('}'), _) => one!(RBrace),
            (Some('['), _) => one!(LBracket),
            (Some(']'), _) => one!(RBracket),
            (Some(','), _) => one!(Comma),
            (Some(';'), _) => one!(Semicolon),
            (Some(':'), _) => one!(Colon),
            (Some('.'), _) => one!(Dot),
            (Some('?'), _) => one!(Question),
            (Some('&'), _) => one!(Amp),
            (Some('|'), _) => one!(Pipe),
            (Some('^'), _) => one!(Caret),
            (Some('!'), _) => one!(Bang),
            (Some('='), _) => one!(Eq),
            (Some('<'), _) => one!(Lt),
            (Some('>'), _) => one!(Gt),
            (Some('+'), _) => one!(Plus),
            (Some('-'), _) => one!(Minus),
            (Some('*'), _) => one!(Star),
            (Some('/'), _) => one!(Slash),
            (Some('%'), _) => one!(Percent),
            (Some('~'), _) => one!(Tilde),
            (Some(other), _) => {
                let loc = Location::new(start_file, start, self.reader.current_pos());
                self.diags.fatal(loc, format!("unexpected character '{}'", other));
            }
            (None, _) => unreachable!("scan_punctuator called at EOF"),
        }
    }

    // ---- directives --------------------------------------------------

    fn skip_directive_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.bump();
        }
    }

    fn read_directive_word(&mut self) -> String {
        self.skip_directive_whitespace();
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s
    }

    fn handle_directive(&mut self, start_file: Sym, start: Position) {
        let word = self.read_directive_word();
        match word.as_str() {
            "define" => self.handle_define(),
            "ifdef" => self.handle_ifdef(start_file, start),
            "endif" => {
                if self.open_taken_ifdefs == 0 {
                    let loc = Location::new(start_file, start, self.reader.current_pos());
                    self.diags.fatal(loc, "'@endif' without matching '@ifdef'");
                }
                self.open_taken_ifdefs -= 1;
            }
            "include" => self.handle_include(start_file, start),
            other => {
                let loc = Location::new(start_file, start, self.reader.current_pos());
                self.diags.fatal(loc, format!("unknown preprocessor directive '@{}'", other));
            }
        }
    }

    fn handle_define(&mut self) {
        let start_file = self.reader.current_file_sym();
        let start = self.reader.current_pos();
        let name = self.read_directive_word();
        if self.macros.contains_key(&name) {
            let loc = Location::new(start_file, start, self.reader.current_pos());
            self.diags.fatal(loc, format!("'{}' is already defined", name));
        }
        let mut replacement = Vec::new();
        loop {
            let start_file = self.reader.current_file_sym();
            let start = self.reader.current_pos();
            self.skip_directive_whitespace();
            if matches!(self.peek(), None | Some('\n')) {
                break;
            }
            if self.peek() == Some('/') && self.peek2() == Some('/') {
                break;
            }
            match self.scan_raw() {
                RawOrDirective::Token(t) => replacement.push(t),
                RawOrDirective::Consumed => {
                    let loc = Location::new(start_file, start, self.reader.current_pos());
                    self.diags.fatal(loc, "nested directive in macro replacement list");
                }
            }
        }
        self.macros.insert(name, replacement);
    }

    fn handle_ifdef(&mut self, start_file: Sym, start: Position) {
        let name = self.read_directive_word();
        if self.macros.contains_key(&name) {
            self.open_taken_ifdefs += 1;
            return;
        }
        // Not defined: skip raw text until the matching `@endif`, tracking
        // nested `@ifdef` blocks so an inner one doesn't end the outer.
        let mut depth: u32 = 1;
        loop {
            match self.peek() {
                None => {
                    let loc = Location::new(start_file, start, self.reader.current_pos());
                    self.diags.fatal(loc, "unterminated '@ifdef' (missing '@endif')");
                }
                Some('@') => {
                    self.bump();
                    let w = self.read_directive_word();
                    match w.as_str() {
                        "ifdef" => {
                            self.read_directive_word();
                            depth += 1;
                        }
                        "endif" => {
                            depth -= 1;
                            if depth == 0 {
                                return;
                            }
                        }
                        _ => {}
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn handle_include(&mut self, start_file: Sym, start: Position) {
        self.skip_directive_whitespace();
        let bracketed = match self.peek() {
            Some('<') => true,
            Some('"') => false,
            _ => {
                let loc = Location::new(start_file, start, self.reader.current_pos());
                self.diags.fatal(loc, "expected '\"file\"' or '<file>' after '@include'");
            }
        };
        let close = if bracketed { '>' } else { '"' };
        self.bump();
        let mut name = String::new();
        loop {
            match self.bump() {
                Some(c) if c == close => break,
                Some(c) => name.push(c),
                None => {
                    let loc = Location::new(start_file, start, self.reader.current_pos());
                    self.diags.fatal(loc, "unterminated '@include' path");
                }
            }
        }
        let current_dir = self.reader.current_dir();
        match self.reader.open_include(&name, bracketed, &current_dir) {
            IncludeOutcome::Opened | IncludeOutcome::AlreadyIncluded => {}
            IncludeOutcome::NotFound => {
                let loc = Location::new(start_file, start, self.reader.current_pos());
                self.diags.fatal(loc, format!("cannot find included file '{}'", name));
            }
        }
    }
}

enum RawOrDirective {
    Token(Token),
    Consumed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexer_over(text: &str) -> (Lexer, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root.abc");
        std::fs::write(&path, text).unwrap();
        let interner = Rc::new(Interner::new());
        let mut reader = Reader::new(interner.clone(), vec![dir.path().to_path_buf()]);
        reader.open_root(&path).unwrap();
        let diags = Rc::new(Diagnostics::new());
        (Lexer::new(reader, interner, diags), dir)
    }

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (mut lx, _dir) = lexer_over(src);
        let mut out = Vec::new();
        loop {
            let t = lx.next_token();
            if t.kind == TokenKind::Eof {
                break;
            }
            out.push(t.kind);
        }
        out
    }

    #[test]
    fn skips_line_and_block_comments() {
        let toks = kinds("// hello\nfn /* inline */ main");
        assert_eq!(toks, vec![TokenKind::KwFn, TokenKind::Ident]);
    }

    #[test]
    fn lexes_hex_and_octal_and_decimal() {
        let (mut lx, _dir) = lexer_over("0x1F 017 42");
        let a = lx.next_token();
        assert_eq!(a.kind, TokenKind::HexLiteral);
        assert_eq!(a.text(), "0x1F");
        let b = lx.next_token();
        assert_eq!(b.kind, TokenKind::OctalLiteral);
        let c = lx.next_token();
        assert_eq!(c.kind, TokenKind::IntLiteral);
        assert_eq!(c.text(), "42");
    }

    #[test]
    fn string_escape_cooking() {
        let (mut lx, _dir) = lexer_over("\"a\\nb\"");
        let t = lx.next_token();
        assert_eq!(t.kind, TokenKind::StringLiteral);
        assert_eq!(t.text(), "a\nb");
    }

    #[test]
    fn three_char_operators() {
        let toks = kinds("a <<= b >>= c");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident,
                TokenKind::ShlEq,
                TokenKind::Ident,
                TokenKind::ShrEq,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn object_macro_expands_inline() {
        let toks_text: Vec<String> = {
            let (mut lx, _dir) = lexer_over("@define SIZE 10\nlocal x: i32 = SIZE;");
            let mut out = Vec::new();
            loop {
                let t = lx.next_token();
                if t.kind == TokenKind::Eof {
                    break;
                }
                out.push(t.text().to_string());
            }
            out
        };
        assert!(toks_text.contains(&"10".to_string()));
        assert!(!toks_text.contains(&"SIZE".to_string()));
    }

    #[test]
    fn self_referential_macro_does_not_loop_forever() {
        let (mut lx, _dir) = lexer_over("@define X X\nX");
        let t = lx.next_token();
        assert_eq!(t.kind, TokenKind::Ident);
        assert_eq!(t.text(), "X");
        assert_eq!(lx.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn ifdef_skips_undefined_block() {
        let toks = kinds("@ifdef NOPE\nbogus syntax here !!!\n@endif\nfn");
        assert_eq!(toks, vec![TokenKind::KwFn]);
    }

    #[test]
    fn ifdef_keeps_defined_block() {
        let toks = kinds("@define YES 1\n@ifdef YES\nfn\n@endif");
        assert_eq!(toks, vec![TokenKind::KwFn]);
    }

    #[test]
    fn nested_ifdef_inside_skipped_block_is_balanced() {
        let toks = kinds("@ifdef NOPE\n@ifdef ALSO_NOPE\nx\n@endif\ny\n@endif\nfn");
        assert_eq!(toks, vec![TokenKind::KwFn]);
    }

    #[test]
    fn nested_ifdef_inside_taken_block_is_balanced() {
        let toks = kinds(
            "@define OUTER 1\n@define INNER 1\n@ifdef OUTER\nfn\n@ifdef INNER\nmain\n@endif\n@endif",
        );
        assert_eq!(toks, vec![TokenKind::KwFn, TokenKind::Ident]);
    }

    #[test]
    fn include_pulls_in_other_file_tokens() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inc.abc"), "fn").unwrap();
        let root = dir.path().join("root.abc");
        std::fs::write(&root, "@include \"inc.abc\"\nreturn").unwrap();
        let interner = Rc::new(Interner::new());
        let mut reader = Reader::new(interner.clone(), vec![]);
        reader.open_root(&root).unwrap();
        let diags = Rc::new(Diagnostics::new());
        let mut lx = Lexer::new(reader, interner, diags);
        assert_eq!(lx.next_token().kind, TokenKind::KwFn);
        assert_eq!(lx.next_token().kind, TokenKind::KwReturn);
    }
}
