//! Drives the [`Scanner`] to produce a flat token stream terminated by EOF.

use crate::diagnostics::Diagnostics;
use crate::scanner::{ScanError, Scanner};
use crate::tokens::{keyword_kind, Span, Token, TokenKind};

const DIAG_SOURCE: &str = "lexer";

#[derive(Debug, Clone, Copy)]
pub struct LexerOptions {
    /// Exclude COMMENT tokens from the returned stream. Default: true.
    pub skip_comments: bool,
    /// Exclude NEWLINE tokens from the returned stream. Default: true.
    pub skip_newlines: bool,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self {
            skip_comments: true,
            skip_newlines: true,
        }
    }
}

pub struct Lexer<'a> {
    scanner: Scanner<'a>,
    options: LexerOptions,
    diagnostics: Diagnostics,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, options: LexerOptions) -> Self {
        Self {
            scanner: Scanner::new(source),
            options,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Tokenizes the entire input, returning the token stream and any
    /// diagnostics recorded along the way. Never aborts early: unclassified
    /// characters and malformed literals are recorded as errors and skipped
    /// so the rest of the file is still tokenized.
    pub fn tokenize(mut self) -> (Vec<Token>, Diagnostics) {
        let mut tokens = Vec::new();
        loop {
            match self.next_raw_token() {
                Some(tok) => {
                    let keep = match &tok.kind {
                        TokenKind::Comment(_) => !self.options.skip_comments,
                        TokenKind::Newline => !self.options.skip_newlines,
                        _ => true,
                    };
                    let is_eof = tok.is_eof();
                    if keep {
                        tokens.push(tok);
                    }
                    if is_eof {
                        break;
                    }
                }
                None => continue,
            }
        }
        (tokens, self.diagnostics)
    }

    fn push_error(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.error(message, span, DIAG_SOURCE);
    }

    fn scan_error_span(&self, mark: crate::scanner::Mark) -> Span {
        self.scanner.span(mark)
    }

    /// The exact source substring a span selects, satisfying the invariant
    /// that every token's lexeme is the text its byte range covers.
    fn slice(&self, span: Span) -> String {
        self.scanner.source()[span.byte_range()].to_string()
    }

    /// Produces the next token, or `None` if the caller should simply loop
    /// again (used for constructs like skipped inline whitespace that do not
    /// themselves produce a token).
    fn next_raw_token(&mut self) -> Option<Token> {
        // Inline whitespace (not newlines) is never emitted as a token.
        while matches!(self.scanner.current(), Some(' ') | Some('\t')) {
            self.scanner.advance();
        }

        let mark = self.scanner.mark();
        let ch = match self.scanner.current() {
            None => {
                let span = self.scanner.span(mark);
                return Some(Token::new(TokenKind::Eof, span, ""));
            }
            Some(c) => c,
        };

        if ch == '\r' || ch == '\n' {
            self.scanner.advance();
            let span = self.scanner.span(mark);
            let lexeme = self.slice(span);
            return Some(Token::new(TokenKind::Newline, span, lexeme));
        }

        if ch == '-' && self.scanner.peek(1) == Some('-') {
            return Some(self.read_comment(mark));
        }

        if Scanner::is_ident_start(ch) {
            let ident = self.scanner.read_identifier();
            let span = self.scanner.span(mark);
            let kind = keyword_kind(&ident).unwrap_or_else(|| TokenKind::Identifier(ident.clone()));
            return Some(Token::new(kind, span, ident));
        }

        if ch.is_ascii_digit() {
            return Some(self.read_number(mark));
        }

        if ch == '"' || ch == '\'' {
            return Some(self.read_string(mark, ch));
        }

        if ch == '[' && matches!(self.scanner.peek(1), Some('[') | Some('=')) {
            if let Some(level) = {
                self.scanner.advance(); // consume '['
                self.scanner.try_long_bracket_level()
            } {
                return Some(self.read_long_string(mark, level));
            } else {
                // Not actually a long bracket opener; treat the consumed '['
                // as LEFT_BRACKET.
                let span = self.scanner.span(mark);
                let lexeme = self.slice(span);
                return Some(Token::new(TokenKind::LBracket, span, lexeme));
            }
        }

        if let Some(tok) = self.read_operator(mark, ch) {
            return Some(tok);
        }

        self.scanner.advance();
        let span = self.scanner.span(mark);
        self.push_error(format!("unexpected character '{}'", ch), span);
        None
    }

    fn read_comment(&mut self, mark: crate::scanner::Mark) -> Token {
        self.scanner.advance_n(2); // consume '--'
        if self.scanner.current() == Some('[') {
            let save = self.scanner.mark();
            self.scanner.advance();
            if let Some(level) = self.scanner.try_long_bracket_level() {
                self.scanner.advance_n(level + 1); // consume '=*[' tail
                return match self.scanner.read_long_string(level) {
                    Ok(text) => {
                        let span = self.scanner.span(mark);
                        let lexeme = self.slice(span);
                        Token::new(TokenKind::Comment(text), span, lexeme)
                    }
                    Err(e) => {
                        let span = self.scan_error_span(mark);
                        self.push_error(e.to_string(), span);
                        let lexeme = self.slice(span);
                        Token::new(TokenKind::Comment(String::new()), span, lexeme)
                    }
                };
            }
            // False alarm: rewind is unnecessary since '[' only starts a
            // line comment body anyway; fall through to line comment using
            // the position we already consumed up to `save`.
            let _ = save;
        }
        let mut text = String::new();
        while !matches!(self.scanner.current(), None | Some('\n') | Some('\r')) {
            text.push(self.scanner.advance().unwrap());
        }
        let span = self.scanner.span(mark);
        let lexeme = self.slice(span);
        Token::new(TokenKind::Comment(text), span, lexeme)
    }

    fn read_number(&mut self, mark: crate::scanner::Mark) -> Token {
        match self.scanner.read_number() {
            Ok(lexeme) => {
                let span = self.scanner.span(mark);
                Token::new(TokenKind::Number(lexeme.clone()), span, lexeme)
            }
            Err(e) => {
                let span = self.scan_error_span(mark);
                self.push_error(e.to_string(), span);
                let lexeme = self.slice(span);
                Token::new(TokenKind::Number("0".to_string()), span, lexeme)
            }
        }
    }

    fn read_string(&mut self, mark: crate::scanner::Mark, quote: char) -> Token {
        self.scanner.advance(); // consume opening quote
        match self.scanner.read_string(quote) {
            Ok(value) => {
                let span = self.scanner.span(mark);
                let lexeme = self.slice(span);
                Token::new(TokenKind::Str(value), span, lexeme)
            }
            Err(e) => {
                let span = self.scan_error_span(mark);
                self.push_error(e.to_string(), span);
                let lexeme = self.slice(span);
                Token::new(TokenKind::Str(String::new()), span, lexeme)
            }
        }
    }

    fn read_long_string(&mut self, mark: crate::scanner::Mark, level: usize) -> Token {
        self.scanner.advance_n(level + 1); // consume '=*[' tail
        match self.scanner.read_long_string(level) {
            Ok(value) => {
                let span = self.scanner.span(mark);
                let lexeme = self.slice(span);
                Token::new(TokenKind::Str(value), span, lexeme)
            }
            Err(e) => {
                let span = self.scan_error_span(mark);
                self.push_error(e.to_string(), span);
                let lexeme = self.slice(span);
                Token::new(TokenKind::Str(String::new()), span, lexeme)
            }
        }
    }

    /// Matches operator/punctuator prefixes longest-first. Returns `None` if
    /// `ch` does not start any known operator or punctuator; the caller is
    /// then responsible for the "unexpected character" diagnostic.
    fn read_operator(&mut self, mark: crate::scanner::Mark, ch: char) -> Option<Token> {
        macro_rules! tok {
            ($n:expr, $kind:expr) => {{
                self.scanner.advance_n($n);
                let span = self.scanner.span(mark);
                let lexeme = self.slice(span);
                return Some(Token::new($kind, span, lexeme));
            }};
        }

        let c1 = self.scanner.peek(1);
        let c2 = self.scanner.peek(2);
        match (ch, c1, c2) {
            ('.', Some('.'), Some('.')) => tok!(3, TokenKind::Ellipsis),
            ('.', Some('.'), _) => tok!(2, TokenKind::DotDot),
            ('.', _, _) => tok!(1, TokenKind::Dot),
            ('=', Some('='), _) => tok!(2, TokenKind::Eq),
            ('=', _, _) => tok!(1, TokenKind::Assign),
            ('~', Some('='), _) => tok!(2, TokenKind::NotEq),
            ('<', Some('='), _) => tok!(2, TokenKind::LtEq),
            ('<', _, _) => tok!(1, TokenKind::Lt),
            ('>', Some('='), _) => tok!(2, TokenKind::GtEq),
            ('>', _, _) => tok!(1, TokenKind::Gt),
            ('/', Some('/'), _) => tok!(2, TokenKind::DSlash),
            ('/', _, _) => tok!(1, TokenKind::Slash),
            (':', Some(':'), _) => tok!(2, TokenKind::DoubleColon),
            (':', _, _) => tok!(1, TokenKind::Colon),
            ('+', _, _) => tok!(1, TokenKind::Plus),
            ('-', _, _) => tok!(1, TokenKind::Minus),
            ('*', _, _) => tok!(1, TokenKind::Star),
            ('%', _, _) => tok!(1, TokenKind::Percent),
            ('^', _, _) => tok!(1, TokenKind::Caret),
            ('#', _, _) => tok!(1, TokenKind::Hash),
            ('(', _, _) => tok!(1, TokenKind::LParen),
            (')', _, _) => tok!(1, TokenKind::RParen),
            ('{', _, _) => tok!(1, TokenKind::LBrace),
            ('}', _, _) => tok!(1, TokenKind::RBrace),
            ('[', _, _) => tok!(1, TokenKind::LBracket),
            (']', _, _) => tok!(1, TokenKind::RBracket),
            (',', _, _) => tok!(1, TokenKind::Comma),
            (';', _, _) => tok!(1, TokenKind::Semicolon),
            _ => None,
        }
    }
}
