//! The minimal native-function standard library installed into the global
//! environment before evaluation. This is intentionally not a faithful
//! reimplementation of the Language's full standard library (see Non-goals);
//! it exists to make the generic-`for` and `__index` testable properties
//! observable from program text, plus a handful of functions programs
//! commonly reach for.

use crate::environment::Scope;
use crate::evaluator::{EvalError, Evaluator, RuntimeError};
use crate::tokens::Span;
use crate::value::{Function, NativeFn, Table, Value};
use std::io::Write;
use std::rc::Rc;

fn native(f: impl Fn(&mut Evaluator, &[Value], Span) -> Result<Vec<Value>, EvalError> + 'static) -> Value {
    let rc: NativeFn = Rc::new(f);
    Value::Function(Function::Native(rc))
}

fn define_global(ev: &mut Evaluator, name: &str, value: Value) {
    let env = Rc::clone(&ev.global_env);
    Scope::define(&env, name, value);
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Nil)
}

fn err(kind: RuntimeError, span: Span) -> EvalError {
    EvalError {
        kind,
        span,
        call_stack: Vec::new(),
    }
}

pub fn install(ev: &mut Evaluator) {
    define_global(ev, "print", native(builtin_print));
    define_global(ev, "type", native(builtin_type));
    define_global(ev, "tostring", native(builtin_tostring));
    define_global(ev, "tonumber", native(builtin_tonumber));
    define_global(ev, "pairs", native(builtin_pairs));
    define_global(ev, "ipairs", native(builtin_ipairs));
    define_global(ev, "next", native(builtin_next));
    define_global(ev, "pcall", native(builtin_pcall));
    define_global(ev, "error", native(builtin_error));
    define_global(ev, "assert", native(builtin_assert));
    define_global(ev, "setmetatable", native(builtin_setmetatable));
    define_global(ev, "getmetatable", native(builtin_getmetatable));
    define_global(ev, "rawget", native(builtin_rawget));
    define_global(ev, "rawset", native(builtin_rawset));
    define_global(ev, "rawequal", native(builtin_rawequal));
    define_global(ev, "select", native(builtin_select));

    define_global(ev, "string", string_table());
    define_global(ev, "table", table_table());
    define_global(ev, "math", math_table());
}

fn builtin_print(ev: &mut Evaluator, args: &[Value], _span: Span) -> Result<Vec<Value>, EvalError> {
    let rendered = args
        .iter()
        .map(crate::evaluator::tostring)
        .collect::<Vec<_>>()
        .join("\t");
    let mut out = ev.output.borrow_mut();
    let _ = writeln!(out, "{}", rendered);
    Ok(Vec::new())
}

fn builtin_type(_ev: &mut Evaluator, args: &[Value], _span: Span) -> Result<Vec<Value>, EvalError> {
    Ok(vec![Value::str(arg(args, 0).type_name())])
}

fn builtin_tostring(_ev: &mut Evaluator, args: &[Value], _span: Span) -> Result<Vec<Value>, EvalError> {
    Ok(vec![Value::str(crate::evaluator::tostring(&arg(args, 0)))])
}

fn builtin_tonumber(_ev: &mut Evaluator, args: &[Value], _span: Span) -> Result<Vec<Value>, EvalError> {
    let value = arg(args, 0);
    let result = match &value {
        Value::Integer(_) | Value::Float(_) => value,
        Value::Str(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Value::Integer(i)
            } else if let Ok(f) = trimmed.parse::<f64>() {
                Value::Float(f)
            } else if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
                match i64::from_str_radix(hex, 16) {
                    Ok(i) => Value::Integer(i),
                    Err(_) => Value::Nil,
                }
            } else {
                Value::Nil
            }
        }
        _ => Value::Nil,
    };
    Ok(vec![result])
}

fn require_table(v: &Value, span: Span) -> Result<Rc<std::cell::RefCell<Table>>, EvalError> {
    match v {
        Value::Table(t) => Ok(Rc::clone(t)),
        other => Err(err(RuntimeError::IndexOnNonIndexable(other.type_name()), span)),
    }
}

/// `pairs(t)` returns `(next, t, nil)`, the generic-`for` iterator triple
/// that drives the stateless `next`-based traversal protocol directly
/// rather than special-casing it in the loop evaluator.
fn builtin_pairs(_ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    let t = arg(args, 0);
    require_table(&t, span)?;
    Ok(vec![native(builtin_next), t, Value::Nil])
}

fn builtin_next(_ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    let t = require_table(&arg(args, 0), span)?;
    let key = arg(args, 1);
    match t.borrow().next_entry(&key) {
        Some((k, v)) => Ok(vec![k, v]),
        None => Ok(vec![Value::Nil]),
    }
}

/// `ipairs(t)` returns `(iter, t, 0)` where `iter(t, i)` walks the
/// integer-keyed array part in order and stops at the first absent key.
fn builtin_ipairs(_ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    let t = arg(args, 0);
    require_table(&t, span)?;
    Ok(vec![native(builtin_ipairs_iter), t, Value::Integer(0)])
}

fn builtin_ipairs_iter(_ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    let t = require_table(&arg(args, 0), span)?;
    let index = match arg(args, 1) {
        Value::Integer(i) => i,
        Value::Float(f) => f as i64,
        _ => 0,
    };
    match t.borrow().ipairs_next(index) {
        Some((i, v)) => Ok(vec![Value::Integer(i), v]),
        None => Ok(vec![Value::Nil]),
    }
}

fn builtin_pcall(ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    if args.is_empty() {
        return Err(err(RuntimeError::CallOnNonCallable("nil"), span));
    }
    let callee = args[0].clone();
    let call_args = &args[1..];
    match ev.call_value(callee, call_args, span) {
        Ok(mut results) => {
            let mut out = vec![Value::Boolean(true)];
            out.append(&mut results);
            Ok(out)
        }
        Err(e) => {
            let message = match e.kind {
                RuntimeError::Raised(v) => v,
                other => Value::str(other.to_string()),
            };
            Ok(vec![Value::Boolean(false), message])
        }
    }
}

fn builtin_error(_ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    Err(err(RuntimeError::Raised(arg(args, 0)), span))
}

fn builtin_assert(_ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    let value = arg(args, 0);
    if value.is_truthy() {
        return Ok(args.to_vec());
    }
    let message = if args.len() > 1 {
        arg(args, 1)
    } else {
        Value::str("assertion failed!")
    };
    Err(err(RuntimeError::Raised(message), span))
}

fn builtin_setmetatable(_ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    let t = require_table(&arg(args, 0), span)?;
    match arg(args, 1) {
        Value::Nil => t.borrow_mut().metatable = None,
        Value::Table(mt) => t.borrow_mut().metatable = Some(mt),
        other => {
            return Err(err(
                RuntimeError::TypeMismatch {
                    op: "setmetatable",
                    lhs: "table",
                    rhs: other.type_name(),
                },
                span,
            ))
        }
    }
    Ok(vec![arg(args, 0)])
}

fn builtin_getmetatable(_ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    let t = require_table(&arg(args, 0), span)?;
    let mt = t.borrow().metatable.clone();
    Ok(vec![mt.map(Value::Table).unwrap_or(Value::Nil)])
}

fn builtin_rawget(_ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    let t = require_table(&arg(args, 0), span)?;
    let value = t.borrow().get(&arg(args, 1));
    Ok(vec![value])
}

fn builtin_rawset(_ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    let t = require_table(&arg(args, 0), span)?;
    t.borrow_mut().set(arg(args, 1), arg(args, 2));
    Ok(vec![arg(args, 0)])
}

fn builtin_rawequal(_ev: &mut Evaluator, args: &[Value], _span: Span) -> Result<Vec<Value>, EvalError> {
    Ok(vec![Value::Boolean(arg(args, 0).raw_equals(&arg(args, 1)))])
}

fn builtin_select(_ev: &mut Evaluator, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
    match args.first() {
        Some(Value::Str(s)) if s.as_ref() == "#" => Ok(vec![Value::Integer(args.len() as i64 - 1)]),
        Some(n) => {
            let n = n.as_f64().ok_or_else(|| {
                err(
                    RuntimeError::TypeMismatch {
                        op: "select",
                        lhs: "number",
                        rhs: n.type_name(),
                    },
                    span,
                )
            })? as i64;
            if n < 1 {
                return Ok(Vec::new());
            }
            Ok(args.iter().skip(n as usize).cloned().collect())
        }
        None => Ok(Vec::new()),
    }
}

// ── string ───────────────────────────────────────────────────────────

fn string_table() -> Value {
    let mut t = Table::new();
    t.set(Value::str("len"), native(|_ev, args, _span| {
        let s = match arg(args, 0) {
            Value::Str(s) => s,
            _ => return Ok(vec![Value::Integer(0)]),
        };
        Ok(vec![Value::Integer(s.len() as i64)])
    }));
    t.set(Value::str("upper"), native(|_ev, args, _span| {
        Ok(vec![Value::str(string_arg(args, 0).to_uppercase())])
    }));
    t.set(Value::str("lower"), native(|_ev, args, _span| {
        Ok(vec![Value::str(string_arg(args, 0).to_lowercase())])
    }));
    t.set(Value::str("rep"), native(|_ev, args, _span| {
        let s = string_arg(args, 0);
        let n = int_arg(args, 1).max(0) as usize;
        Ok(vec![Value::str(s.repeat(n))])
    }));
    t.set(Value::str("sub"), native(|_ev, args, _span| {
        let s = string_arg(args, 0);
        let chars: Vec<char> = s.chars().collect();
        let len = chars.len() as i64;
        let normalize = |i: i64| -> i64 {
            if i < 0 {
                (len + i + 1).max(1)
            } else if i == 0 {
                1
            } else {
                i
            }
        };
        let i = normalize(int_arg(args, 1));
        let j = if args.len() > 2 { normalize(int_arg(args, 2)).min(len) } else { len };
        if i > j || i > len {
            return Ok(vec![Value::str("")]);
        }
        let slice: String = chars[(i as usize - 1)..(j as usize)].iter().collect();
        Ok(vec![Value::str(slice)])
    }));
    Value::table(t)
}

fn string_arg(args: &[Value], i: usize) -> String {
    match arg(args, i) {
        Value::Str(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn int_arg(args: &[Value], i: usize) -> i64 {
    match arg(args, i) {
        Value::Integer(v) => v,
        Value::Float(f) => f as i64,
        _ => 0,
    }
}

// ── table ────────────────────────────────────────────────────────────

fn table_table() -> Value {
    let mut t = Table::new();
    t.set(Value::str("insert"), native(|_ev, args, span| {
        let target = require_table(&arg(args, 0), span)?;
        if args.len() >= 3 {
            let pos = int_arg(args, 1);
            let value = arg(args, 2);
            let len = target.borrow().len();
            let mut i = len;
            while i >= pos {
                let moved = target.borrow().get(&Value::Integer(i));
                target.borrow_mut().set(Value::Integer(i + 1), moved);
                i -= 1;
            }
            target.borrow_mut().set(Value::Integer(pos), value);
        } else {
            let len = target.borrow().len();
            target.borrow_mut().set(Value::Integer(len + 1), arg(args, 1));
        }
        Ok(Vec::new())
    }));
    t.set(Value::str("remove"), native(|_ev, args, span| {
        let target = require_table(&arg(args, 0), span)?;
        let len = target.borrow().len();
        if len == 0 {
            return Ok(vec![Value::Nil]);
        }
        let pos = if args.len() > 1 { int_arg(args, 1) } else { len };
        let removed = target.borrow().get(&Value::Integer(pos));
        let mut i = pos;
        while i < len {
            let next = target.borrow().get(&Value::Integer(i + 1));
            target.borrow_mut().set(Value::Integer(i), next);
            i += 1;
        }
        target.borrow_mut().set(Value::Integer(len), Value::Nil);
        Ok(vec![removed])
    }));
    t.set(Value::str("concat"), native(|_ev, args, span| {
        let target = require_table(&arg(args, 0), span)?;
        let sep = if args.len() > 1 { string_arg(args, 1) } else { String::new() };
        let len = target.borrow().len();
        let mut parts = Vec::with_capacity(len.max(0) as usize);
        for i in 1..=len {
            parts.push(crate::evaluator::tostring(&target.borrow().get(&Value::Integer(i))));
        }
        Ok(vec![Value::str(parts.join(&sep))])
    }));
    Value::table(t)
}

// ── math ─────────────────────────────────────────────────────────────

fn math_table() -> Value {
    let mut t = Table::new();
    t.set(Value::str("pi"), Value::Float(std::f64::consts::PI));
    t.set(Value::str("huge"), Value::Float(f64::INFINITY));
    t.set(Value::str("floor"), native(|_ev, args, span| {
        Ok(vec![Value::Integer(num_arg(args, 0, span)?.floor() as i64)])
    }));
    t.set(Value::str("ceil"), native(|_ev, args, span| {
        Ok(vec![Value::Integer(num_arg(args, 0, span)?.ceil() as i64)])
    }));
    t.set(Value::str("abs"), native(|_ev, args, span| {
        match arg(args, 0) {
            Value::Integer(i) => Ok(vec![Value::Integer(i.abs())]),
            other => Ok(vec![Value::Float(num_arg(&[other], 0, span)?.abs())]),
        }
    }));
    t.set(Value::str("sqrt"), native(|_ev, args, span| {
        Ok(vec![Value::Float(num_arg(args, 0, span)?.sqrt())])
    }));
    t.set(Value::str("max"), native(|_ev, args, span| {
        let mut best = num_arg(args, 0, span)?;
        for i in 1..args.len() {
            best = best.max(num_arg(args, i, span)?);
        }
        Ok(vec![Value::Float(best)])
    }));
    t.set(Value::str("min"), native(|_ev, args, span| {
        let mut best = num_arg(args, 0, span)?;
        for i in 1..args.len() {
            best = best.min(num_arg(args, i, span)?);
        }
        Ok(vec![Value::Float(best)])
    }));
    Value::table(t)
}

fn num_arg(args: &[Value], i: usize, span: Span) -> Result<f64, EvalError> {
    let v = arg(args, i);
    v.as_f64().ok_or_else(|| {
        err(
            RuntimeError::TypeMismatch {
                op: "math",
                lhs: "number",
                rhs: v.type_name(),
            },
            span,
        )
    })
}
