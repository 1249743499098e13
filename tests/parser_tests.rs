//! Parser tests: precedence/associativity, statement disambiguation, and
//! error-recovery (a syntax error records a diagnostic but still yields a
//! usable partial AST).

use rill_lang::ast::{BinaryOp, Expression, Statement};
use rill_lang::lexer::LexerOptions;
use rill_lang::parser::{parse, ParserOptions};

fn parse_ok(source: &str) -> rill_lang::ast::Program {
    let (program, diagnostics) = parse(source, LexerOptions::default(), ParserOptions::default());
    assert!(!diagnostics.has_errors(), "unexpected diagnostics: {:?}", diagnostics.entries());
    program
}

fn single_expression(source: &str) -> Expression {
    let program = parse_ok(source);
    match &program.body[0] {
        Statement::Expression(s) => s.expression.clone(),
        Statement::Local(s) => s.init[0].clone(),
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

// ─── precedence and associativity ───

#[test]
fn multiplication_binds_tighter_than_addition() {
    let expr = single_expression("local x = 1 + 2 * 3");
    let Expression::Binary { operator, right, .. } = expr else {
        panic!("expected binary expression");
    };
    assert_eq!(operator, BinaryOp::Add);
    assert!(matches!(*right, Expression::Binary { operator: BinaryOp::Mul, .. }));
}

#[test]
fn concat_is_right_associative() {
    // a .. b .. c should parse as a .. (b .. c)
    let expr = single_expression(r#"local x = "a" .. "b" .. "c""#);
    let Expression::Binary { operator, right, .. } = expr else {
        panic!("expected binary expression");
    };
    assert_eq!(operator, BinaryOp::Concat);
    assert!(matches!(*right, Expression::Binary { operator: BinaryOp::Concat, .. }));
}

#[test]
fn pow_is_right_associative_and_binds_tighter_than_unary_minus() {
    // -a^b should parse as -(a^b)
    let expr = single_expression("local x = -a^b");
    match expr {
        Expression::Unary { argument, .. } => {
            assert!(matches!(*argument, Expression::Binary { operator: BinaryOp::Pow, .. }));
        }
        other => panic!("expected unary expression, got {:?}", other),
    }
}

#[test]
fn pow_right_associative_chain() {
    // a^b^c should parse as a^(b^c)
    let expr = single_expression("local x = a^b^c");
    let Expression::Binary { operator, right, .. } = expr else {
        panic!("expected binary expression");
    };
    assert_eq!(operator, BinaryOp::Pow);
    assert!(matches!(*right, Expression::Binary { operator: BinaryOp::Pow, .. }));
}

#[test]
fn comparison_and_logical_precedence() {
    // a < b and c < d  should parse as (a < b) and (c < d)
    let expr = single_expression("local x = a < b and c < d");
    let Expression::Binary { operator, left, right, .. } = expr else {
        panic!("expected binary expression");
    };
    assert_eq!(operator, BinaryOp::And);
    assert!(matches!(*left, Expression::Binary { operator: BinaryOp::Lt, .. }));
    assert!(matches!(*right, Expression::Binary { operator: BinaryOp::Lt, .. }));
}

// ─── statement disambiguation ───

#[test]
fn bare_call_statement() {
    let program = parse_ok("print(1, 2)");
    assert!(matches!(&program.body[0], Statement::Expression(s) if matches!(s.expression, Expression::Call { .. })));
}

#[test]
fn multiple_assignment_targets() {
    let program = parse_ok("a, b = b, a");
    let Statement::Assignment(s) = &program.body[0] else {
        panic!("expected an assignment statement");
    };
    assert_eq!(s.targets.len(), 2);
    assert_eq!(s.init.len(), 2);
}

#[test]
fn numeric_for_vs_generic_for() {
    let program = parse_ok("for i = 1, 10 do end for k, v in pairs(t) do end");
    assert!(matches!(program.body[0], Statement::ForNumeric(_)));
    assert!(matches!(program.body[1], Statement::ForGeneric(_)));
}

#[test]
fn method_call_lowers_receiver_into_first_argument() {
    let expr = single_expression("local x = obj:method(1)");
    let Expression::Call { arguments, is_method, .. } = expr else {
        panic!("expected a call expression");
    };
    assert!(is_method);
    assert_eq!(arguments.len(), 2);
    assert!(matches!(arguments[0], Expression::Identifier(_)));
}

#[test]
fn vararg_function_declaration() {
    let program = parse_ok("local function f(a, ...) return a end");
    let Statement::FunctionDeclaration(s) = &program.body[0] else {
        panic!("expected a function declaration");
    };
    assert!(s.is_vararg);
    assert_eq!(s.params.len(), 1);
}

// ─── error recovery ───

#[test]
fn missing_end_token_still_yields_a_program() {
    let (program, diagnostics) = parse("if true then print(1)", LexerOptions::default(), ParserOptions::default());
    assert!(diagnostics.has_errors());
    assert!(!program.body.is_empty());
}

#[test]
fn invalid_assignment_target_is_reported_without_aborting() {
    let (program, diagnostics) = parse("1 = 2", LexerOptions::default(), ParserOptions::default());
    assert!(diagnostics.has_errors());
    assert!(!program.body.is_empty());
}

// ─── bare semicolons ───

#[test]
fn bare_semicolon_is_an_empty_statement_not_a_do_block() {
    let program = parse_ok(";");
    assert!(matches!(program.body[0], Statement::Empty(_)));
}

#[test]
fn semicolons_between_statements_do_not_produce_do_blocks() {
    let program = parse_ok("local x = 1;; print(x)");
    assert!(program.body.iter().any(|s| matches!(s, Statement::Empty(_))));
    assert!(!program.body.iter().any(|s| matches!(s, Statement::Do(_))));
}
