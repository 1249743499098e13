//! Token and span types shared by the scanner, lexer, parser, and printer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based line/column position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A source range: start/end positions plus the byte offsets they correspond to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl Span {
    pub fn new(start: Position, end: Position, start_offset: usize, end_offset: usize) -> Self {
        Self {
            start,
            end,
            start_offset,
            end_offset,
        }
    }

    /// A zero-width span at the very start of a file, used only as a placeholder
    /// before any real span is known.
    pub fn dummy() -> Self {
        Self {
            start: Position::start(),
            end: Position::start(),
            start_offset: 0,
            end_offset: 0,
        }
    }

    /// The smallest span that encloses both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        let (start, start_offset) = if self.start_offset <= other.start_offset {
            (self.start, self.start_offset)
        } else {
            (other.start, other.start_offset)
        };
        let (end, end_offset) = if self.end_offset >= other.end_offset {
            (self.end, self.end_offset)
        } else {
            (other.end, other.end_offset)
        };
        Span::new(start, end, start_offset, end_offset)
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start_offset..self.end_offset
    }
}

/// Tagged token kind. Numbers, strings, and identifiers retain their exact
/// source lexeme so the printer and evaluator can re-derive the literal value
/// without the lexer committing to integer-vs-float or escape-decoding
/// decisions that belong downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    Number(String),
    Str(String),
    Boolean(bool),
    Nil,
    Identifier(String),

    // Keywords
    If,
    Then,
    Else,
    Elseif,
    End,
    While,
    Do,
    For,
    In,
    Repeat,
    Until,
    Function,
    Local,
    Return,
    Break,
    Goto,
    And,
    Or,
    Not,

    // Operators / punctuators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    DSlash,     // //
    Percent,    // %
    Caret,      // ^
    Hash,       // #
    Assign,     // =
    Eq,         // ==
    NotEq,      // ~=
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    Dot,        // .
    DotDot,     // ..
    Ellipsis,   // ...
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    LBracket,   // [
    RBracket,   // ]
    Comma,      // ,
    Semicolon,  // ;
    Colon,      // :
    DoubleColon, // ::

    Eof,
    Newline,
    Comment(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(s) => write!(f, "{}", s),
            TokenKind::Str(s) => write!(f, "{:?}", s),
            TokenKind::Boolean(b) => write!(f, "{}", b),
            TokenKind::Nil => write!(f, "nil"),
            TokenKind::Identifier(s) => write!(f, "{}", s),
            TokenKind::If => write!(f, "if"),
            TokenKind::Then => write!(f, "then"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::Elseif => write!(f, "elseif"),
            TokenKind::End => write!(f, "end"),
            TokenKind::While => write!(f, "while"),
            TokenKind::Do => write!(f, "do"),
            TokenKind::For => write!(f, "for"),
            TokenKind::In => write!(f, "in"),
            TokenKind::Repeat => write!(f, "repeat"),
            TokenKind::Until => write!(f, "until"),
            TokenKind::Function => write!(f, "function"),
            TokenKind::Local => write!(f, "local"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::Break => write!(f, "break"),
            TokenKind::Goto => write!(f, "goto"),
            TokenKind::And => write!(f, "and"),
            TokenKind::Or => write!(f, "or"),
            TokenKind::Not => write!(f, "not"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::DSlash => write!(f, "//"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Hash => write!(f, "#"),
            TokenKind::Assign => write!(f, "="),
            TokenKind::Eq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "~="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::LtEq => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::GtEq => write!(f, ">="),
            TokenKind::Dot => write!(f, "."),
            TokenKind::DotDot => write!(f, ".."),
            TokenKind::Ellipsis => write!(f, "..."),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::DoubleColon => write!(f, "::"),
            TokenKind::Eof => write!(f, "<eof>"),
            TokenKind::Newline => write!(f, "<newline>"),
            TokenKind::Comment(_) => write!(f, "<comment>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// The exact source substring this token was scanned from.
    pub lexeme: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            lexeme: lexeme.into(),
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// Looks up a keyword `TokenKind` for an identifier lexeme, if any.
pub fn keyword_kind(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "if" => TokenKind::If,
        "then" => TokenKind::Then,
        "else" => TokenKind::Else,
        "elseif" => TokenKind::Elseif,
        "end" => TokenKind::End,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "repeat" => TokenKind::Repeat,
        "until" => TokenKind::Until,
        "function" => TokenKind::Function,
        "local" => TokenKind::Local,
        "return" => TokenKind::Return,
        "break" => TokenKind::Break,
        "goto" => TokenKind::Goto,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "true" => TokenKind::Boolean(true),
        "false" => TokenKind::Boolean(false),
        "nil" => TokenKind::Nil,
        _ => return None,
    })
}
