//! Token kinds and the keyword table.

use crate::location::Location;
use crate::strings::Sym;

/// The closed set of token kinds. Keywords are carved out of the
/// identifier stream by a table lookup in the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Newline,
    Ident,
    IntLiteral,
    HexLiteral,
    OctalLiteral,
    CharLiteral,
    StringLiteral,

    // Keywords
    KwFn,
    KwIf,
    KwElse,
    KwWhile,
    KwFor,
    KwDo,
    KwReturn,
    KwBreak,
    KwContinue,
    KwSwitch,
    KwCase,
    KwDefault,
    KwStruct,
    KwEnum,
    KwUnion,
    KwType,
    KwGlobal,
    KwLocal,
    KwExtern,
    KwStatic,
    KwConst,
    KwArray,
    KwOf,
    KwSizeof,
    KwNullptr,
    KwGoto,
    KwLabel,
    KwAssert,
    KwThen,
    KwReadonly,
    KwAuto,

    // Punctuators
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Ellipsis,
    Arrow,     // ->
    Question,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Bang,
    BangEq,
    Eq,
    EqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    PlusPlus,
    PlusEq,
    Minus,
    MinusMinus,
    MinusEq,
    Star,
    StarEq,
    Slash,
    SlashEq,
    Percent,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,
    Tilde,
    Shl,
    ShlEq,
    Shr,
    ShrEq,
}

impl TokenKind {
    /// Look up a keyword by spelling; returns `None` for ordinary
    /// identifiers.
    pub fn keyword(spelling: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match spelling {
            "fn" => KwFn,
            "if" => KwIf,
            "else" => KwElse,
            "while" => KwWhile,
            "for" => KwFor,
            "do" => KwDo,
            "return" => KwReturn,
            "break" => KwBreak,
            "continue" => KwContinue,
            "switch" => KwSwitch,
            "case" => KwCase,
            "default" => KwDefault,
            "struct" => KwStruct,
            "enum" => KwEnum,
            "union" => KwUnion,
            "type" => KwType,
            "global" => KwGlobal,
            "local" => KwLocal,
            "extern" => KwExtern,
            "static" => KwStatic,
            "const" => KwConst,
            "array" => KwArray,
            "of" => KwOf,
            "sizeof" => KwSizeof,
            "nullptr" => KwNullptr,
            "goto" => KwGoto,
            "label" => KwLabel,
            "assert" => KwAssert,
            "then" => KwThen,
            "readonly" => KwReadonly,
            "auto" => KwAuto,
            _ => return None,
        })
    }
}

/// A single lexical token: location, kind, and raw/cooked text handles
///. For kinds other than string/char literals, `raw`
/// and `cooked` are the same handle.
#[derive(Debug, Clone)]
pub struct Token {
    pub loc: Location,
    pub kind: TokenKind,
    pub raw: Sym,
    pub cooked: Sym,
}

impl Token {
    pub fn new(loc: Location, kind: TokenKind, raw: Sym, cooked: Sym) -> Self {
        Token { loc, kind, raw, cooked }
    }

    pub fn text(&self) -> &str {
        self.cooked.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_covers_all_keywords() {
        let names = [
            "fn", "if", "else", "while", "for", "do", "return", "break", "continue", "switch",
            "case", "default", "struct", "enum", "union", "type", "global", "local", "extern",
            "static", "const", "array", "of", "sizeof", "nullptr", "goto", "label", "assert",
            "then",
        ];
        for n in names {
            assert!(TokenKind::keyword(n).is_some(), "missing keyword {n}");
        }
    }

    #[test]
    fn non_keyword_identifier_is_none() {
        assert!(TokenKind::keyword("my_var").is_none());
    }
}
