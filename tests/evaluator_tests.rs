//! End-to-end evaluator tests: parse + evaluate a program and inspect its
//! return values and/or captured `print` output.

use rill_lang::evaluator::{evaluate, EvaluatorOptions};
use rill_lang::lexer::LexerOptions;
use rill_lang::parser::{parse, ParserOptions};
use rill_lang::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

fn run(source: &str) -> (bool, Vec<Value>, String) {
    let (program, diagnostics) = parse(source, LexerOptions::default(), ParserOptions::default());
    assert!(!diagnostics.has_errors(), "source failed to parse: {:?}", diagnostics.entries());
    let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    let sink: Rc<RefCell<dyn std::io::Write>> = output.clone();
    let (ok, values, eval_diagnostics) = evaluate(&program, EvaluatorOptions::default(), sink);
    if !ok {
        panic!("program raised: {}", eval_diagnostics.render_all(source));
    }
    let captured = String::from_utf8(output.borrow().clone()).unwrap();
    (ok, values, captured)
}

fn run_fails(source: &str) -> String {
    let (program, diagnostics) = parse(source, LexerOptions::default(), ParserOptions::default());
    assert!(!diagnostics.has_errors());
    let output = Rc::new(RefCell::new(Vec::new()));
    let (ok, _, eval_diagnostics) = evaluate(&program, EvaluatorOptions::default(), output);
    assert!(!ok, "expected the program to raise a runtime error");
    eval_diagnostics.render_all(source)
}

fn int(v: &Value) -> i64 {
    match v {
        Value::Integer(i) => *i,
        other => panic!("expected an integer, got {:?}", other),
    }
}

// ─── arithmetic and truthiness ───

#[test]
fn integer_arithmetic_stays_integer() {
    let (_, values, _) = run("return 7 + 3 * 2");
    assert_eq!(int(&values[0]), 13);
}

#[test]
fn division_always_produces_a_float() {
    let (_, values, _) = run("return 4 / 2");
    assert!(matches!(values[0], Value::Float(f) if f == 2.0));
}

#[test]
fn floor_division_and_modulo_follow_divisor_sign() {
    let (_, values, _) = run("return -7 // 2, -7 % 2");
    assert_eq!(int(&values[0]), -4);
    assert_eq!(int(&values[1]), 1);
}

#[test]
fn only_nil_and_false_are_falsy() {
    let (_, values, _) = run("return (0 and 1), (\"\" and 2)");
    assert_eq!(int(&values[0]), 1);
    assert_eq!(int(&values[1]), 2);
}

#[test]
fn and_or_return_operand_values_not_booleans() {
    let (_, values, _) = run("return nil or 5, 3 and 4");
    assert_eq!(int(&values[0]), 5);
    assert_eq!(int(&values[1]), 4);
}

// ─── multi-return and varargs ───

#[test]
fn function_can_return_multiple_values() {
    let (_, values, _) = run("local function pair() return 1, 2 end return pair()");
    assert_eq!(int(&values[0]), 1);
    assert_eq!(int(&values[1]), 2);
}

#[test]
fn non_tail_call_is_truncated_to_one_value() {
    let (_, values, _) = run("local function pair() return 1, 2 end return pair(), 9");
    assert_eq!(int(&values[0]), 1);
    assert_eq!(int(&values[1]), 9);
}

#[test]
fn varargs_collect_and_expand() {
    let (_, values, _) = run("local function f(...) return ... end return f(1, 2, 3)");
    assert_eq!(values.len(), 3);
    assert_eq!(int(&values[2]), 3);
}

// ─── closures ───

#[test]
fn closures_capture_their_defining_environment() {
    let (_, values, _) = run(
        r#"
local function make_counter()
  local n = 0
  return function()
    n = n + 1
    return n
  end
end
local c = make_counter()
c()
c()
return c()
"#,
    );
    assert_eq!(int(&values[0]), 3);
}

#[test]
fn recursive_local_function_can_call_itself() {
    let (_, values, _) = run(
        r#"
local function fact(n)
  if n <= 1 then return 1 end
  return n * fact(n - 1)
end
return fact(5)
"#,
    );
    assert_eq!(int(&values[0]), 120);
}

// ─── tables and __index ───

#[test]
fn table_index_with_nested_function_default() {
    let (_, values, _) = run(
        r#"
local base = {greet = function(self) return "hi" end}
local derived = setmetatable({}, {__index = base})
return derived:greet()
"#,
    );
    match &values[0] {
        Value::Str(s) => assert_eq!(s.as_ref(), "hi"),
        other => panic!("expected a string, got {:?}", other),
    }
}

#[test]
fn index_function_receives_original_table_not_metatable() {
    let (_, values, _) = run(
        r#"
local log = {}
local proxy = setmetatable({}, {
  __index = function(t, k)
    log[#log + 1] = t
    return k
  end,
})
local _ = proxy.anything
return log[1] == proxy
"#,
    );
    assert!(matches!(values[0], Value::Boolean(true)));
}

// ─── generic and numeric for ───

#[test]
fn generic_for_over_pairs_visits_every_entry() {
    let (_, values, _) = run(
        r#"
local t = {10, 20, 30}
local sum = 0
for k, v in pairs(t) do
  sum = sum + v
end
return sum
"#,
    );
    assert_eq!(int(&values[0]), 60);
}

#[test]
fn numeric_for_with_negative_step() {
    let (_, _, output) = run("for i = 3, 1, -1 do print(i) end");
    assert_eq!(output, "3\n2\n1\n");
}

#[test]
fn numeric_for_promotes_to_float_when_any_operand_is_a_float() {
    let (_, values, _) = run(
        r#"
local last = nil
for i = 1, 2.5 do
  last = i
end
return last
"#,
    );
    assert!(matches!(values[0], Value::Float(f) if f == 2.0));
}

#[test]
fn for_loop_with_zero_step_raises() {
    let rendered = run_fails("for i = 1, 10, 0 do end");
    assert!(rendered.to_lowercase().contains("step"));
}

// ─── pcall / error / assert ───

#[test]
fn pcall_catches_error_and_returns_false_plus_message() {
    let (_, values, _) = run(r#"return pcall(function() error("boom") end)"#);
    assert!(matches!(values[0], Value::Boolean(false)));
    match &values[1] {
        Value::Str(s) => assert_eq!(s.as_ref(), "boom"),
        other => panic!("expected the raised value, got {:?}", other),
    }
}

#[test]
fn pcall_on_success_prepends_true() {
    let (_, values, _) = run("return pcall(function() return 1, 2 end)");
    assert!(matches!(values[0], Value::Boolean(true)));
    assert_eq!(int(&values[1]), 1);
    assert_eq!(int(&values[2]), 2);
}

#[test]
fn assert_raises_with_custom_message_on_falsy_value() {
    let rendered = run_fails(r#"assert(false, "custom failure")"#);
    assert!(rendered.contains("custom failure"));
}

// ─── budgets ───

#[test]
fn step_budget_is_enforced() {
    let (program, diagnostics) = parse("while true do end", LexerOptions::default(), ParserOptions::default());
    assert!(!diagnostics.has_errors());
    let output = Rc::new(RefCell::new(Vec::new()));
    let options = EvaluatorOptions {
        max_steps: Some(1000),
        ..EvaluatorOptions::default()
    };
    let (ok, _, eval_diagnostics) = evaluate(&program, options, output);
    assert!(!ok);
    assert!(eval_diagnostics.render_all("while true do end").to_lowercase().contains("budget"));
}

#[test]
fn undefined_variable_is_nil_in_non_strict_mode() {
    let (_, values, _) = run("return undefined_name");
    assert!(matches!(values[0], Value::Nil));
}

#[test]
fn undefined_variable_raises_in_strict_mode() {
    let (program, diagnostics) = parse("return undefined_name", LexerOptions::default(), ParserOptions::default());
    assert!(!diagnostics.has_errors());
    let output = Rc::new(RefCell::new(Vec::new()));
    let options = EvaluatorOptions {
        strict: true,
        ..EvaluatorOptions::default()
    };
    let (ok, _, _) = evaluate(&program, options, output);
    assert!(!ok);
}

#[test]
fn closure_defined_inside_a_loop_captures_a_fresh_binding_each_iteration() {
    let (_, values, _) = run(
        r#"
local fns = {}
for i = 1, 3 do
  fns[i] = function() return i end
end
return fns[1](), fns[2](), fns[3]()
"#,
    );
    assert_eq!(int(&values[0]), 1);
    assert_eq!(int(&values[1]), 2);
    assert_eq!(int(&values[2]), 3);
}

#[test]
fn parenthesizing_a_call_truncates_it_to_one_value_in_a_table_field() {
    let (_, values, _) = run(
        r#"
local function f() return 1, 2, 3 end
local t = {(f())}
return #t
"#,
    );
    assert_eq!(int(&values[0]), 1);
}

#[test]
fn parenthesizing_a_call_truncates_it_to_one_value_in_tail_position() {
    let (_, values, _) = run(
        r#"
local function f() return 1, 2, 3 end
return (f())
"#,
    );
    assert_eq!(values.len(), 1);
    assert_eq!(int(&values[0]), 1);
}

#[test]
fn unparenthesized_call_still_expands_in_tail_position() {
    let (_, values, _) = run(
        r#"
local function f() return 1, 2, 3 end
return f()
"#,
    );
    assert_eq!(values.len(), 3);
}
