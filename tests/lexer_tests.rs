//! Scanner/lexer tests: token classification, longest-prefix operator
//! matching, string/number literal scanning, and error recovery.

use rill_lang::lexer::{Lexer, LexerOptions};
use rill_lang::tokens::TokenKind;

fn kinds(source: &str) -> Vec<TokenKind> {
    let (tokens, _) = Lexer::new(source, LexerOptions::default()).tokenize();
    tokens.into_iter().map(|t| t.kind).collect()
}

// ─── keywords and identifiers ───

#[test]
fn keywords_classified_over_identifiers() {
    let ks = kinds("local x = not y");
    assert_eq!(
        ks,
        vec![
            TokenKind::Local,
            TokenKind::Identifier("x".into()),
            TokenKind::Assign,
            TokenKind::Not,
            TokenKind::Identifier("y".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn identifier_with_underscore_and_digits() {
    let ks = kinds("_foo_123");
    assert_eq!(ks, vec![TokenKind::Identifier("_foo_123".into()), TokenKind::Eof]);
}

// ─── operators: longest match first ───

#[test]
fn operators_prefer_longer_match() {
    let ks = kinds("a ~= b == c <= d >= e // f");
    assert_eq!(
        ks,
        vec![
            TokenKind::Identifier("a".into()),
            TokenKind::NotEq,
            TokenKind::Identifier("b".into()),
            TokenKind::Eq,
            TokenKind::Identifier("c".into()),
            TokenKind::LtEq,
            TokenKind::Identifier("d".into()),
            TokenKind::GtEq,
            TokenKind::Identifier("e".into()),
            TokenKind::DSlash,
            TokenKind::Identifier("f".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn ellipsis_beats_dotdot_beats_dot() {
    assert_eq!(kinds("..."), vec![TokenKind::Ellipsis, TokenKind::Eof]);
    assert_eq!(kinds(".."), vec![TokenKind::DotDot, TokenKind::Eof]);
    assert_eq!(kinds("."), vec![TokenKind::Dot, TokenKind::Eof]);
}

// ─── numbers ───

#[test]
fn hex_integer_and_hex_float_lexemes() {
    let ks = kinds("0xFF 0x1p4 0x1.8p1");
    assert_eq!(
        ks,
        vec![
            TokenKind::Number("0xFF".into()),
            TokenKind::Number("0x1p4".into()),
            TokenKind::Number("0x1.8p1".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn decimal_float_with_exponent() {
    let ks = kinds("6.02e23");
    assert_eq!(ks, vec![TokenKind::Number("6.02e23".into()), TokenKind::Eof]);
}

// ─── strings ───

#[test]
fn quoted_string_decodes_escapes() {
    let ks = kinds(r#""a\tb\n\65""#);
    assert_eq!(ks, vec![TokenKind::Str("a\tb\nA".into()), TokenKind::Eof]);
}

#[test]
fn long_bracket_string_skips_leading_newline() {
    let ks = kinds("[[\nhello]]");
    assert_eq!(ks, vec![TokenKind::Str("hello".into()), TokenKind::Eof]);
}

#[test]
fn long_bracket_string_with_equals_level() {
    let ks = kinds("[==[a]]b]==]");
    assert_eq!(ks, vec![TokenKind::Str("a]]b".into()), TokenKind::Eof]);
}

#[test]
fn unterminated_string_is_recorded_as_diagnostic() {
    let (_, diagnostics) = Lexer::new("\"unterminated", LexerOptions::default()).tokenize();
    assert!(diagnostics.has_errors());
}

// ─── comments ───

#[test]
fn line_comment_is_skipped_by_default() {
    let ks = kinds("local x -- trailing comment\n= 1");
    assert_eq!(
        ks,
        vec![
            TokenKind::Local,
            TokenKind::Identifier("x".into()),
            TokenKind::Assign,
            TokenKind::Number("1".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn comments_retained_when_option_set() {
    let (tokens, _) = Lexer::new(
        "-- hi\nx",
        LexerOptions {
            skip_comments: false,
            skip_newlines: true,
        },
    )
    .tokenize();
    assert!(matches!(tokens[0].kind, TokenKind::Comment(_)));
}

// ─── unrecognized input recovers ───

#[test]
fn unrecognized_character_is_skipped_with_diagnostic() {
    let (tokens, diagnostics) = Lexer::new("local x = 1 @ local y = 2", LexerOptions::default()).tokenize();
    assert!(diagnostics.has_errors());
    // the rest of the file is still tokenized past the bad character
    assert!(tokens.iter().any(|t| matches!(&t.kind, TokenKind::Identifier(s) if s == "y")));
}

// ─── span bookkeeping ───

#[test]
fn token_spans_are_in_source_order_and_non_overlapping() {
    let (tokens, _) = Lexer::new("a b c", LexerOptions::default()).tokenize();
    for pair in tokens.windows(2) {
        assert!(pair[0].span.end_offset <= pair[1].span.start_offset);
    }
}

// ─── lexemes always match the source they were scanned from ───

#[test]
fn operator_lexemes_match_their_source_text() {
    let (tokens, _) = Lexer::new("~= <= >= // ... .. . ::", LexerOptions::default()).tokenize();
    let lexemes: Vec<&str> = tokens
        .iter()
        .filter(|t| !matches!(t.kind, TokenKind::Eof))
        .map(|t| t.lexeme.as_str())
        .collect();
    assert_eq!(lexemes, vec!["~=", "<=", ">=", "//", "...", "..", ".", "::"]);
}

#[test]
fn string_lexeme_includes_quotes_and_escapes_verbatim() {
    let (tokens, _) = Lexer::new(r#""a\tb""#, LexerOptions::default()).tokenize();
    assert_eq!(tokens[0].lexeme, r#""a\tb""#);
}

#[test]
fn long_bracket_string_lexeme_includes_brackets() {
    let (tokens, _) = Lexer::new("[==[a]]b]==]", LexerOptions::default()).tokenize();
    assert_eq!(tokens[0].lexeme, "[==[a]]b]==]");
}

#[test]
fn comment_lexeme_matches_source_including_dashes() {
    let (tokens, _) = Lexer::new(
        "-- hi there\nx",
        LexerOptions {
            skip_comments: false,
            skip_newlines: true,
        },
    )
    .tokenize();
    assert_eq!(tokens[0].lexeme, "-- hi there");
}

#[test]
fn newline_lexeme_preserves_crlf() {
    let (tokens, _) = Lexer::new(
        "a\r\nb",
        LexerOptions {
            skip_comments: true,
            skip_newlines: false,
        },
    )
    .tokenize();
    let newline = tokens
        .iter()
        .find(|t| matches!(t.kind, TokenKind::Newline))
        .unwrap();
    assert_eq!(newline.lexeme, "\r\n");
}

#[test]
fn crlf_counts_as_one_line_break() {
    let (tokens, _) = Lexer::new("a\r\nb", LexerOptions::default()).tokenize();
    let b = tokens
        .iter()
        .find(|t| matches!(&t.kind, TokenKind::Identifier(s) if s == "b"))
        .unwrap();
    assert_eq!(b.span.start.line, 2);
}
