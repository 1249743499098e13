//! Printer tests: the printer is defined as the parser's structural
//! inverse, so most assertions here re-parse the printed text and compare
//! it for semantic equivalence rather than expecting byte-for-byte output.

use rill_lang::lexer::LexerOptions;
use rill_lang::parser::{parse, ParserOptions};
use rill_lang::printer::{print, PrinterOptions};

fn roundtrip(source: &str) -> String {
    let (program, diagnostics) = parse(source, LexerOptions::default(), ParserOptions::default());
    assert!(!diagnostics.has_errors(), "source failed to parse: {:?}", diagnostics.entries());
    print(&program, PrinterOptions::default())
}

fn reparses_cleanly(printed: &str) {
    let (_, diagnostics) = parse(printed, LexerOptions::default(), ParserOptions::default());
    assert!(!diagnostics.has_errors(), "printed output failed to re-parse:\n{}\n{:?}", printed, diagnostics.entries());
}

#[test]
fn simple_statements_round_trip() {
    let printed = roundtrip("local x = 1 + 2\nprint(x)");
    assert!(printed.contains("local x = 1 + 2"));
    assert!(printed.contains("print(x)"));
    reparses_cleanly(&printed);
}

#[test]
fn if_chain_round_trips_structurally() {
    let printed = roundtrip(
        r#"
if a then
  print(1)
elseif b then
  print(2)
else
  print(3)
end
"#,
    );
    assert!(printed.contains("if a then"));
    assert!(printed.contains("elseif b then"));
    assert!(printed.contains("else"));
    reparses_cleanly(&printed);
}

#[test]
fn function_declaration_round_trips() {
    let printed = roundtrip("function f(a, b, ...)\n  return a + b\nend");
    assert!(printed.starts_with("function f(a, b, ...)"));
    reparses_cleanly(&printed);
}

#[test]
fn necessary_parens_are_reinserted_for_precedence() {
    // (1 + 2) * 3 must keep its parens; otherwise it would re-parse as 1 + (2 * 3).
    let printed = roundtrip("local x = (1 + 2) * 3");
    assert!(printed.contains('('), "expected parens to be preserved: {}", printed);
    let (program, _) = parse(&printed, LexerOptions::default(), ParserOptions::default());
    let rill_lang::ast::Statement::Local(s) = &program.body[0] else {
        panic!("expected a local statement");
    };
    let rill_lang::ast::Expression::Binary { operator, .. } = &s.init[0] else {
        panic!("expected a binary expression");
    };
    assert_eq!(*operator, rill_lang::ast::BinaryOp::Mul);
}

#[test]
fn redundant_parens_around_left_associative_chain_are_dropped() {
    // (1 + 2) + 3 does not need its parens since + is left-associative.
    let printed = roundtrip("local x = (1 + 2) + 3");
    assert!(!printed.contains('('), "did not expect parens: {}", printed);
}

#[test]
fn string_with_newline_uses_long_bracket_form() {
    let printed = roundtrip("local s = \"line one\\nline two\"");
    assert!(printed.contains("[["));
    reparses_cleanly(&printed);
}

#[test]
fn table_constructor_round_trips() {
    let printed = roundtrip(r#"local t = {1, 2, x = 3, [k] = 4}"#);
    reparses_cleanly(&printed);
}

#[test]
fn method_call_prints_with_colon_syntax() {
    let printed = roundtrip("obj:method(1, 2)");
    assert!(printed.contains("obj:method(1, 2)"));
}

#[test]
fn numeric_for_with_step_round_trips() {
    let printed = roundtrip("for i = 10, 1, -1 do\n  print(i)\nend");
    assert!(printed.contains("for i = 10, 1, -1 do"));
    reparses_cleanly(&printed);
}

#[test]
fn bare_semicolon_prints_as_semicolon_not_a_do_block() {
    let printed = roundtrip(";");
    assert_eq!(printed.trim(), ";");
    assert!(!printed.contains("do"));
}

#[test]
fn parenthesized_call_keeps_its_parens_when_printed() {
    let printed = roundtrip("local function f() return 1, 2 end\nlocal t = {(f())}");
    assert!(printed.contains("(f())"), "expected parens preserved: {}", printed);
    reparses_cleanly(&printed);
}
