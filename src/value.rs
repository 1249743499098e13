//! Runtime values, tables, and closures.

use crate::ast::Statement;
use crate::environment::Env;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

pub type NativeFn = Rc<
    dyn Fn(&mut crate::evaluator::Evaluator, &[Value], crate::tokens::Span) -> Result<Vec<Value>, crate::evaluator::EvalError>,
>;

/// A user-defined closure: the parameter list, vararg flag, and body are
/// shared (never re-cloned per call); `captured_env` is the environment in
/// effect at the point the function expression was evaluated, not the
/// caller's environment.
pub struct Closure {
    pub params: Vec<String>,
    pub is_vararg: bool,
    pub body: Rc<Vec<Statement>>,
    pub captured_env: Env,
    pub name: RefCell<Option<String>>,
}

#[derive(Clone)]
pub enum Function {
    Native(NativeFn),
    Closure(Rc<Closure>),
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native(_) => write!(f, "<native function>"),
            Function::Closure(c) => write!(f, "<function: {:?}>", c.name.borrow()),
        }
    }
}

/// A key used to index a [`Table`]. Integral floats are normalized to
/// `Integer` so that `t[1]` and `t[1.0]` address the same slot, matching the
/// Language's table-key equality rule. Tables and functions key by pointer
/// identity since they have no structural equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TableKey {
    Integer(i64),
    /// Bit pattern of a non-integral float, so distinct NaN/float payloads
    /// remain distinguishable without requiring `Eq` on `f64` itself.
    Float(u64),
    Str(String),
    Bool(bool),
    Object(usize),
}

impl TableKey {
    pub fn from_value(value: &Value) -> Option<TableKey> {
        match value {
            Value::Nil => None,
            Value::Integer(i) => Some(TableKey::Integer(*i)),
            Value::Float(f) => {
                if f.is_nan() {
                    None
                } else if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(TableKey::Integer(*f as i64))
                } else {
                    Some(TableKey::Float(f.to_bits()))
                }
            }
            Value::Str(s) => Some(TableKey::Str(s.to_string())),
            Value::Boolean(b) => Some(TableKey::Bool(*b)),
            Value::Table(t) => Some(TableKey::Object(Rc::as_ptr(t) as usize)),
            Value::Function(Function::Closure(c)) => Some(TableKey::Object(Rc::as_ptr(c) as usize)),
            Value::Function(Function::Native(f)) => {
                Some(TableKey::Object(Rc::as_ptr(f) as *const () as usize))
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Table {
    /// Insertion-ordered entries, keyed by the normalized [`TableKey`] with
    /// the original `Value` retained so iteration (`pairs`/`next`) can hand
    /// back the exact key value that was stored.
    entries: IndexMap<TableKey, (Value, Value)>,
    pub metatable: Option<Rc<RefCell<Table>>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Value) -> Value {
        match TableKey::from_value(key) {
            Some(k) => self.entries.get(&k).map(|(_, v)| v.clone()).unwrap_or(Value::Nil),
            None => Value::Nil,
        }
    }

    pub fn set(&mut self, key: Value, value: Value) {
        let Some(k) = TableKey::from_value(&key) else {
            return;
        };
        if matches!(value, Value::Nil) {
            self.entries.shift_remove(&k);
            return;
        }
        self.entries.insert(k, (key, value));
    }

    pub fn len(&self) -> i64 {
        // The "array part" length: the largest `n` such that keys `1..=n`
        // are all present with no holes.
        let mut n: i64 = 0;
        loop {
            let next = n + 1;
            if self.entries.contains_key(&TableKey::Integer(next)) {
                n = next;
            } else {
                break;
            }
        }
        n
    }

    /// Returns the `(key, value)` pair that follows `key` in insertion
    /// order, or the first pair when `key` is `Nil`. Implements the `next`
    /// half of the generic-`for` iterator protocol used by `pairs`.
    pub fn next_entry(&self, key: &Value) -> Option<(Value, Value)> {
        if matches!(key, Value::Nil) {
            return self.entries.values().next().cloned();
        }
        let target = TableKey::from_value(key)?;
        let index = self.entries.get_index_of(&target)?;
        self.entries.get_index(index + 1).map(|(_, v)| v.clone())
    }

    /// Walks the integer-keyed array part in order, for `ipairs`.
    pub fn ipairs_next(&self, index: i64) -> Option<(i64, Value)> {
        let next = index + 1;
        self.entries
            .get(&TableKey::Integer(next))
            .map(|(_, v)| (next, v.clone()))
    }
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Str(Rc<str>),
    Table(Rc<RefCell<Table>>),
    Function(Function),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn table(t: Table) -> Value {
        Value::Table(Rc::new(RefCell::new(t)))
    }

    /// Only `nil` and `false` are falsy; everything else, including `0` and
    /// the empty string, is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::Str(_) => "string",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Lua-style raw equality: numbers compare by mathematical value across
    /// integer/float representations; everything else compares by identity
    /// or structural equality as appropriate.
    pub fn raw_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Function(Function::Closure(a)), Value::Function(Function::Closure(b))) => {
                Rc::ptr_eq(a, b)
            }
            (Value::Function(Function::Native(a)), Value::Function(Function::Native(b))) => {
                Rc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

/// Canonical decimal rendering for a float, shared with the printer's number
/// formatting: integral-valued floats keep a trailing `.0` so they are never
/// mistaken for an integer by a reader (or by re-parsing printed output).
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if f == f.trunc() && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        let s = format!("{}", f);
        if !s.contains('.') && !s.contains('e') {
            format!("{}.0", s)
        } else {
            s
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Table(t) => write!(f, "table: {:#014x}", Rc::as_ptr(t) as usize),
            Value::Function(Function::Closure(c)) => {
                write!(f, "function: {:#014x}", Rc::as_ptr(c) as usize)
            }
            Value::Function(Function::Native(nf)) => {
                write!(f, "function: builtin: {:#014x}", Rc::as_ptr(nf) as *const () as usize)
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Parameters bound for a single call, discarding surplus positional
/// arguments beyond `params.len()` unless the callee is vararg, in which
/// case the surplus is collected separately for `...`.
pub struct BoundArgs {
    pub named: HashMap<String, Value>,
    pub varargs: Vec<Value>,
}

pub fn bind_arguments(params: &[String], is_vararg: bool, args: &[Value]) -> BoundArgs {
    let mut named = HashMap::with_capacity(params.len());
    for (i, name) in params.iter().enumerate() {
        named.insert(name.clone(), args.get(i).cloned().unwrap_or(Value::Nil));
    }
    let varargs = if is_vararg && args.len() > params.len() {
        args[params.len()..].to_vec()
    } else {
        Vec::new()
    };
    BoundArgs { named, varargs }
}
