//! Diagnostics rendering: severity labels, source-snippet context, and
//! multi-entry collection across a pipeline run.

use rill_lang::diagnostics::{Diagnostics, Severity};
use rill_lang::lexer::LexerOptions;
use rill_lang::parser::{parse, ParserOptions};
use rill_lang::tokens::Span;

#[test]
fn rendered_entry_includes_position_severity_and_message() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error("unexpected token", Span::dummy(), "parser");
    let rendered = diagnostics.render_all("local x = 1");
    assert!(rendered.contains("1:1"));
    assert!(rendered.contains("[ERROR]"));
    assert!(rendered.contains("(parser)"));
    assert!(rendered.contains("unexpected token"));
}

#[test]
fn rendered_entry_includes_the_offending_source_line_and_a_caret() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error("bad", Span::dummy(), "parser");
    let rendered = diagnostics.render_all("local x = 1\nlocal y = 2");
    assert!(rendered.contains("local x = 1"));
    assert!(rendered.contains('^'));
}

#[test]
fn warnings_do_not_count_toward_has_errors() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.warning("just a heads up", Span::dummy(), "parser");
    assert!(!diagnostics.has_errors());
    assert_eq!(diagnostics.error_count(), 0);
    assert_eq!(diagnostics.entries().len(), 1);
    assert_eq!(diagnostics.entries()[0].severity, Severity::Warning);
}

#[test]
fn multiple_diagnostics_preserve_insertion_order() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error("first", Span::dummy(), "lexer");
    diagnostics.error("second", Span::dummy(), "parser");
    let entries = diagnostics.into_vec();
    assert_eq!(entries[0].message, "first");
    assert_eq!(entries[1].message, "second");
}

#[test]
fn a_parse_with_multiple_syntax_errors_collects_all_of_them() {
    let (_, diagnostics) = parse("if then end while do end", LexerOptions::default(), ParserOptions::default());
    assert!(diagnostics.error_count() >= 2);
}
