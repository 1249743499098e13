//! Tree-walking evaluator: executes a [`Program`] against lexical
//! environments, implementing control flow, closures, table construction,
//! member lookup with `__index` delegation, multi-return, and iterator-
//! protocol-aware generic `for`.

use crate::ast::*;
use crate::diagnostics::Diagnostics;
use crate::environment::{Env, Scope};
use crate::tokens::Span;
use crate::value::{bind_arguments, Function, Table, Value};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use thiserror::Error;

/// The evaluator's error taxonomy (§7 SemanticError / BudgetError). Carries
/// no span itself — [`EvalError`] pairs a `RuntimeError` with the span of
/// the node that raised it and the call-span stack collected on the way up.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("attempt to perform arithmetic ({op}) on a {lhs} value and a {rhs} value")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("attempt to call a {0} value")]
    CallOnNonCallable(&'static str),
    #[error("attempt to index a {0} value")]
    IndexOnNonIndexable(&'static str),
    #[error("attempt to compare a {lhs} value with a {rhs} value")]
    Incomparable {
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("attempt to concatenate a {0} value")]
    NonConcatable(&'static str),
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("attempt to perform 'n{0}0' with a zero divisor")]
    DivisionByZero(&'static str),
    #[error("stack overflow")]
    StackOverflow,
    #[error("'for' step is zero")]
    StepOfZero,
    #[error("'__index' chain exceeded the maximum lookup depth")]
    MetatableCycle,
    #[error("no visible label '{0}' to goto")]
    GotoUnresolved(String),
    #[error("execution step budget exhausted")]
    StepsExhausted,
    #[error("call depth budget exhausted")]
    DepthExhausted,
    #[error("{0}")]
    Raised(Value),
}

/// A runtime fault: the offending node's span, the `RuntimeError` kind, and
/// the stack of call-site spans collected while unwinding.
#[derive(Debug, Clone)]
pub struct EvalError {
    pub kind: RuntimeError,
    pub span: Span,
    pub call_stack: Vec<Span>,
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.span.start.line, self.span.start.column, self.kind)
    }
}

pub type NativeFn =
    Rc<dyn Fn(&mut Evaluator, &[Value], Span) -> Result<Vec<Value>, EvalError>>;

#[derive(Debug, Clone, Copy)]
pub struct EvaluatorOptions {
    /// Total statement executions allowed before `StepsExhausted`. `None`
    /// means unbounded.
    pub max_steps: Option<u64>,
    pub max_call_depth: usize,
    /// When true, reading an undefined variable raises `UndefinedVariable`
    /// instead of producing `nil`.
    pub strict: bool,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            max_steps: None,
            max_call_depth: 200,
            strict: false,
        }
    }
}

/// Non-local control transfer produced by executing a statement. A block
/// propagates `Return`/`Break`/unresolved `Goto` upward until a handling
/// construct (function call, loop, or matching label) intercepts it.
enum ControlFlow {
    Normal,
    Return(Vec<Value>),
    Break,
    Goto(String),
}

pub struct Evaluator {
    pub global_env: Env,
    options: EvaluatorOptions,
    steps: u64,
    call_depth: usize,
    call_stack: Vec<Span>,
    /// One entry per active call frame; the vararg values bound to that
    /// frame's `...`, empty for non-vararg frames.
    varargs_stack: Vec<Vec<Value>>,
    pub output: Rc<RefCell<dyn Write>>,
}

impl Evaluator {
    pub fn new(options: EvaluatorOptions, output: Rc<RefCell<dyn Write>>) -> Self {
        let global_env = Scope::root();
        let mut ev = Self {
            global_env: Rc::clone(&global_env),
            options,
            steps: 0,
            call_depth: 0,
            call_stack: Vec::new(),
            varargs_stack: vec![Vec::new()],
            output,
        };
        crate::stdlib::install(&mut ev);
        ev
    }

    fn err(&self, kind: RuntimeError, span: Span) -> EvalError {
        EvalError {
            kind,
            span,
            call_stack: self.call_stack.clone(),
        }
    }

    fn tick(&mut self, span: Span) -> Result<(), EvalError> {
        if let Some(max) = self.options.max_steps {
            self.steps += 1;
            if self.steps > max {
                return Err(self.err(RuntimeError::StepsExhausted, span));
            }
        }
        Ok(())
    }

    // ── Program / blocks ─────────────────────────────────────────────

    pub fn run(&mut self, program: &Program) -> Result<Vec<Value>, EvalError> {
        let env = Rc::clone(&self.global_env);
        match self.exec_block(&program.body, &env)? {
            ControlFlow::Return(values) => Ok(values),
            ControlFlow::Goto(label) => Err(self.err(RuntimeError::GotoUnresolved(label), program.span)),
            ControlFlow::Break | ControlFlow::Normal => Ok(Vec::new()),
        }
    }

    fn exec_block(&mut self, body: &[Statement], env: &Env) -> Result<ControlFlow, EvalError> {
        let mut i = 0;
        while i < body.len() {
            match self.exec_statement(&body[i], env)? {
                ControlFlow::Normal => i += 1,
                ControlFlow::Goto(label) => {
                    match body
                        .iter()
                        .position(|s| matches!(s, Statement::Label(l) if l.name == label))
                    {
                        Some(pos) => i = pos + 1,
                        None => return Ok(ControlFlow::Goto(label)),
                    }
                }
                other => return Ok(other),
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn exec_statement(&mut self, stmt: &Statement, env: &Env) -> Result<ControlFlow, EvalError> {
        self.tick(stmt.span())?;
        match stmt {
            Statement::Expression(s) => {
                self.eval_expr_multi(&s.expression, env)?;
                Ok(ControlFlow::Normal)
            }
            Statement::Local(s) => {
                let values = self.eval_expr_list(&s.init, env)?;
                for (i, var) in s.variables.iter().enumerate() {
                    let value = values.get(i).cloned().unwrap_or(Value::Nil);
                    Scope::define(env, &var.name, value);
                }
                Ok(ControlFlow::Normal)
            }
            Statement::Assignment(s) => {
                let values = self.eval_expr_list(&s.init, env)?;
                for (i, target) in s.targets.iter().enumerate() {
                    let value = values.get(i).cloned().unwrap_or(Value::Nil);
                    self.assign_target(target, value, env)?;
                }
                Ok(ControlFlow::Normal)
            }
            Statement::FunctionDeclaration(s) => {
                self.exec_function_declaration(s, env)?;
                Ok(ControlFlow::Normal)
            }
            Statement::If(s) => self.exec_if(s, env),
            Statement::While(s) => self.exec_while(s, env),
            Statement::Repeat(s) => self.exec_repeat(s, env),
            Statement::ForNumeric(s) => self.exec_for_numeric(s, env),
            Statement::ForGeneric(s) => self.exec_for_generic(s, env),
            Statement::Return(s) => {
                let values = self.eval_expr_list(&s.arguments, env)?;
                Ok(ControlFlow::Return(values))
            }
            Statement::Break(_) => Ok(ControlFlow::Break),
            Statement::Do(s) => {
                let child = Scope::child(env);
                self.exec_block(&s.body, &child)
            }
            Statement::Goto(s) => Ok(ControlFlow::Goto(s.label.clone())),
            Statement::Label(_) => Ok(ControlFlow::Normal),
            Statement::Empty(_) => Ok(ControlFlow::Normal),
        }
    }

    fn exec_function_declaration(
        &mut self,
        s: &FunctionDeclarationStmt,
        env: &Env,
    ) -> Result<(), EvalError> {
        if let Expression::Identifier(id) = &s.name {
            if s.is_local {
                // Pre-declare so the closure can capture its own binding for
                // recursive calls (`local function f() ... f() ... end`).
                Scope::define(env, &id.name, Value::Nil);
                let closure = self.make_closure(s, env, Some(id.name.clone()));
                Scope::assign(env, &id.name, closure);
                return Ok(());
            }
            let closure = self.make_closure(s, env, Some(id.name.clone()));
            Scope::assign(env, &id.name, closure);
            return Ok(());
        }
        let closure = self.make_closure(s, env, None);
        self.assign_target(&s.name, closure, env)?;
        Ok(())
    }

    fn make_closure(&self, s: &FunctionDeclarationStmt, env: &Env, name: Option<String>) -> Value {
        Value::Function(Function::Closure(Rc::new(crate::value::Closure {
            params: s.params.iter().map(|p| p.name.clone()).collect(),
            is_vararg: s.is_vararg,
            body: Rc::new(s.body.clone()),
            captured_env: Rc::clone(env),
            name: RefCell::new(name),
        })))
    }

    fn exec_if(&mut self, s: &IfStmt, env: &Env) -> Result<ControlFlow, EvalError> {
        for clause in &s.clauses {
            if self.eval_expr(&clause.condition, env)?.is_truthy() {
                let child = Scope::child(env);
                return self.exec_block(&clause.body, &child);
            }
        }
        if let Some(else_body) = &s.else_body {
            let child = Scope::child(env);
            return self.exec_block(else_body, &child);
        }
        Ok(ControlFlow::Normal)
    }

    fn exec_while(&mut self, s: &WhileStmt, env: &Env) -> Result<ControlFlow, EvalError> {
        while self.eval_expr(&s.condition, env)?.is_truthy() {
            let child = Scope::child(env);
            match self.exec_block(&s.body, &child)? {
                ControlFlow::Normal => {}
                ControlFlow::Break => break,
                other => return Ok(other),
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn exec_repeat(&mut self, s: &RepeatStmt, env: &Env) -> Result<ControlFlow, EvalError> {
        loop {
            // The `until` condition's scope includes locals declared in the
            // body, so the body env is created before the body is executed
            // and reused to evaluate the condition.
            let child = Scope::child(env);
            match self.exec_block(&s.body, &child)? {
                ControlFlow::Normal => {}
                ControlFlow::Break => break,
                other => return Ok(other),
            }
            if self.eval_expr(&s.condition, &child)?.is_truthy() {
                break;
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn exec_for_numeric(&mut self, s: &ForNumericStmt, env: &Env) -> Result<ControlFlow, EvalError> {
        let start = self.eval_expr(&s.start, env)?;
        let end = self.eval_expr(&s.end, env)?;
        let step = match &s.step {
            Some(e) => self.eval_expr(e, env)?,
            None => Value::Integer(1),
        };
        let all_integer = matches!(start, Value::Integer(_))
            && matches!(end, Value::Integer(_))
            && matches!(step, Value::Integer(_));
        let span = s.span;
        if all_integer {
            let (start, end, step) = match (&start, &end, &step) {
                (Value::Integer(a), Value::Integer(b), Value::Integer(c)) => (*a, *b, *c),
                _ => unreachable!(),
            };
            if step == 0 {
                return Err(self.err(RuntimeError::StepOfZero, span));
            }
            let mut i = start;
            loop {
                if (step > 0 && i > end) || (step < 0 && i < end) {
                    break;
                }
                let child = Scope::child(env);
                Scope::define(&child, &s.variable.name, Value::Integer(i));
                match self.exec_block(&s.body, &child)? {
                    ControlFlow::Normal => {}
                    ControlFlow::Break => break,
                    other => return Ok(other),
                }
                match i.checked_add(step) {
                    Some(next) => i = next,
                    None => break,
                }
            }
        } else {
            let to_f = |v: &Value, span: Span| -> Result<f64, EvalError> {
                v.as_f64()
                    .ok_or_else(|| self.err(RuntimeError::TypeMismatch { op: "for", lhs: v.type_name(), rhs: "number" }, span))
            };
            let start = to_f(&start, s.start.span())?;
            let end = to_f(&end, s.end.span())?;
            let step = to_f(&step, s.step.as_ref().map(|e| e.span()).unwrap_or(span))?;
            if step == 0.0 {
                return Err(self.err(RuntimeError::StepOfZero, span));
            }
            let mut i = start;
            loop {
                if (step > 0.0 && i > end) || (step < 0.0 && i < end) {
                    break;
                }
                let child = Scope::child(env);
                Scope::define(&child, &s.variable.name, Value::Float(i));
                match self.exec_block(&s.body, &child)? {
                    ControlFlow::Normal => {}
                    ControlFlow::Break => break,
                    other => return Ok(other),
                }
                i += step;
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn exec_for_generic(&mut self, s: &ForGenericStmt, env: &Env) -> Result<ControlFlow, EvalError> {
        let mut values = self.eval_expr_list(&s.iterators, env)?;
        while values.len() < 3 {
            values.push(Value::Nil);
        }
        let iter_fn = values[0].clone();
        let state = values[1].clone();
        let mut control = values[2].clone();
        loop {
            let results = self.call_value(iter_fn.clone(), &[state.clone(), control.clone()], s.span)?;
            let first = results.first().cloned().unwrap_or(Value::Nil);
            if matches!(first, Value::Nil) {
                break;
            }
            control = first;
            let child = Scope::child(env);
            for (i, var) in s.variables.iter().enumerate() {
                let value = results.get(i).cloned().unwrap_or(Value::Nil);
                Scope::define(&child, &var.name, value);
            }
            match self.exec_block(&s.body, &child)? {
                ControlFlow::Normal => {}
                ControlFlow::Break => break,
                other => return Ok(other),
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn assign_target(&mut self, target: &Expression, value: Value, env: &Env) -> Result<(), EvalError> {
        match target {
            Expression::Identifier(id) => {
                Scope::assign(env, &id.name, value);
                Ok(())
            }
            Expression::Member {
                base,
                name,
                computed_key,
                computed,
                span,
            } => {
                let base_value = self.eval_expr(base, env)?;
                let key = if *computed {
                    self.eval_expr(computed_key.as_ref().expect("computed member has a key"), env)?
                } else {
                    Value::str(name.clone())
                };
                match base_value {
                    Value::Table(t) => {
                        t.borrow_mut().set(key, value);
                        Ok(())
                    }
                    other => Err(self.err(RuntimeError::IndexOnNonIndexable(other.type_name()), *span)),
                }
            }
            _ => Ok(()), // parser already recorded an InvalidAssignmentTarget diagnostic
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    /// Evaluates `expr` to a single value, truncating a `Call`/`Vararg`
    /// result to its first value (or `nil`).
    pub fn eval_expr(&mut self, expr: &Expression, env: &Env) -> Result<Value, EvalError> {
        match expr {
            Expression::Literal(lit) => Ok(literal_to_value(lit)),
            Expression::Identifier(id) => match Scope::get(env, &id.name) {
                Some(v) => Ok(v),
                None if self.options.strict => {
                    Err(self.err(RuntimeError::UndefinedVariable(id.name.clone()), id.span))
                }
                None => Ok(Value::Nil),
            },
            Expression::Binary {
                operator,
                left,
                right,
                span,
            } => self.eval_binary(*operator, left, right, *span, env),
            Expression::Unary {
                operator,
                argument,
                span,
            } => self.eval_unary(*operator, argument, *span, env),
            Expression::Function {
                params,
                is_vararg,
                body,
                ..
            } => Ok(Value::Function(Function::Closure(Rc::new(crate::value::Closure {
                params: params.iter().map(|p| p.name.clone()).collect(),
                is_vararg: *is_vararg,
                body: Rc::new(body.clone()),
                captured_env: Rc::clone(env),
                name: RefCell::new(None),
            })))),
            Expression::Call { .. } => {
                let results = self.eval_call(expr, env)?;
                Ok(results.into_iter().next().unwrap_or(Value::Nil))
            }
            Expression::Member {
                base,
                name,
                computed_key,
                computed,
                span,
            } => {
                let base_value = self.eval_expr(base, env)?;
                let key = if *computed {
                    self.eval_expr(computed_key.as_ref().expect("computed member has a key"), env)?
                } else {
                    Value::str(name.clone())
                };
                self.index_get(&base_value, &key, *span)
            }
            Expression::TableConstructor { fields, .. } => self.eval_table_constructor(fields, env),
            Expression::Vararg(_) => Ok(self.current_varargs().first().cloned().unwrap_or(Value::Nil)),
            Expression::Paren { inner, .. } => self.eval_expr(inner, env),
        }
    }

    /// Evaluates `expr`, returning every value it produces: the full return
    /// list for a `Call`, or the full collected vararg list for `...`.
    /// Every other expression kind always produces exactly one value.
    fn eval_expr_multi(&mut self, expr: &Expression, env: &Env) -> Result<Vec<Value>, EvalError> {
        match expr {
            Expression::Call { .. } => self.eval_call(expr, env),
            Expression::Vararg(_) => Ok(self.current_varargs().to_vec()),
            _ => Ok(vec![self.eval_expr(expr, env)?]),
        }
    }

    /// Evaluates a comma-separated expression list with call/vararg
    /// expansion in the final position only, matching `Local`/`Assignment`
    /// init-lists, call arguments, return arguments, and table array fields.
    fn eval_expr_list(&mut self, exprs: &[Expression], env: &Env) -> Result<Vec<Value>, EvalError> {
        let mut out = Vec::new();
        for (i, expr) in exprs.iter().enumerate() {
            if i + 1 == exprs.len() {
                out.extend(self.eval_expr_multi(expr, env)?);
            } else {
                out.push(self.eval_expr(expr, env)?);
            }
        }
        Ok(out)
    }

    fn current_varargs(&self) -> &[Value] {
        self.varargs_stack.last().map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn eval_call(&mut self, expr: &Expression, env: &Env) -> Result<Vec<Value>, EvalError> {
        let Expression::Call {
            callee,
            arguments,
            span,
            ..
        } = expr
        else {
            unreachable!("eval_call invoked on a non-Call expression")
        };
        let callee_value = self.eval_expr(callee, env)?;
        let args = self.eval_expr_list(arguments, env)?;
        self.call_value(callee_value, &args, *span)
    }

    pub fn call_value(&mut self, callee: Value, args: &[Value], span: Span) -> Result<Vec<Value>, EvalError> {
        let Value::Function(function) = callee else {
            return Err(self.err(RuntimeError::CallOnNonCallable(callee.type_name()), span));
        };
        if self.call_depth + 1 > self.options.max_call_depth {
            return Err(self.err(RuntimeError::DepthExhausted, span));
        }
        self.call_depth += 1;
        self.call_stack.push(span);
        let result = match function {
            Function::Native(native) => native(self, args, span),
            Function::Closure(closure) => {
                let call_env = Scope::child(&closure.captured_env);
                let bound = bind_arguments(&closure.params, closure.is_vararg, args);
                for (name, value) in bound.named {
                    Scope::define(&call_env, &name, value);
                }
                self.varargs_stack.push(bound.varargs);
                let outcome = self.exec_block(&closure.body, &call_env);
                self.varargs_stack.pop();
                match outcome {
                    Ok(ControlFlow::Return(values)) => Ok(values),
                    Ok(ControlFlow::Goto(label)) => Err(self.err(RuntimeError::GotoUnresolved(label), span)),
                    Ok(ControlFlow::Normal) | Ok(ControlFlow::Break) => Ok(Vec::new()),
                    Err(e) => Err(e),
                }
            }
        };
        self.call_depth -= 1;
        self.call_stack.pop();
        result
    }

    // ── Member / `__index` lookup ──────────────────────────────────────

    const MAX_INDEX_DEPTH: usize = 100;

    fn index_get(&mut self, base: &Value, key: &Value, span: Span) -> Result<Value, EvalError> {
        match base {
            Value::Table(t) => {
                let direct = t.borrow().get(key);
                if !matches!(direct, Value::Nil) {
                    return Ok(direct);
                }
                let metatable = t.borrow().metatable.clone();
                self.index_via_metatable(base, metatable, key, span, 0)
            }
            other => Err(self.err(RuntimeError::IndexOnNonIndexable(other.type_name()), span)),
        }
    }

    /// `base` is the original table `t` in `t[k]`/`t.k`, re-passed unchanged
    /// through the chain so a `__index` function receives `(t, k)` rather
    /// than the intermediate metatable it was found on.
    fn index_via_metatable(
        &mut self,
        base: &Value,
        metatable: Option<Rc<RefCell<Table>>>,
        key: &Value,
        span: Span,
        depth: usize,
    ) -> Result<Value, EvalError> {
        if depth > Self::MAX_INDEX_DEPTH {
            return Err(self.err(RuntimeError::MetatableCycle, span));
        }
        let Some(metatable) = metatable else {
            return Ok(Value::Nil);
        };
        let index_field = metatable.borrow().get(&Value::str("__index"));
        match index_field {
            Value::Nil => Ok(Value::Nil),
            Value::Table(inner) => {
                let direct = inner.borrow().get(key);
                if !matches!(direct, Value::Nil) {
                    return Ok(direct);
                }
                let next_metatable = inner.borrow().metatable.clone();
                self.index_via_metatable(base, next_metatable, key, span, depth + 1)
            }
            Value::Function(_) => {
                let results = self.call_value(index_field, &[base.clone(), key.clone()], span)?;
                Ok(results.into_iter().next().unwrap_or(Value::Nil))
            }
            _ => Ok(Value::Nil),
        }
    }

    // ── Operators ──────────────────────────────────────────────────────

    fn eval_binary(
        &mut self,
        operator: BinaryOp,
        left: &Expression,
        right: &Expression,
        span: Span,
        env: &Env,
    ) -> Result<Value, EvalError> {
        match operator {
            BinaryOp::And => {
                let l = self.eval_expr(left, env)?;
                if l.is_truthy() {
                    self.eval_expr(right, env)
                } else {
                    Ok(l)
                }
            }
            BinaryOp::Or => {
                let l = self.eval_expr(left, env)?;
                if l.is_truthy() {
                    Ok(l)
                } else {
                    self.eval_expr(right, env)
                }
            }
            _ => {
                let l = self.eval_expr(left, env)?;
                let r = self.eval_expr(right, env)?;
                self.apply_binary_op(operator, l, r, span)
            }
        }
    }

    fn apply_binary_op(&self, op: BinaryOp, l: Value, r: Value, span: Span) -> Result<Value, EvalError> {
        use BinaryOp::*;
        match op {
            Add | Sub | Mul | Div | FloorDiv | Mod | Pow => self.arithmetic(op, l, r, span),
            Concat => self.concat(l, r, span),
            Eq => Ok(Value::Boolean(l.raw_equals(&r))),
            NotEq => Ok(Value::Boolean(!l.raw_equals(&r))),
            Lt | LtEq | Gt | GtEq => self.compare(op, l, r, span),
            And | Or => unreachable!("short-circuit operators are handled in eval_binary"),
        }
    }

    fn arithmetic(&self, op: BinaryOp, l: Value, r: Value, span: Span) -> Result<Value, EvalError> {
        use BinaryOp::*;
        if !l.is_number() || !r.is_number() {
            let bad = if !l.is_number() { &l } else { &r };
            return Err(self.err(
                RuntimeError::TypeMismatch {
                    op: op.symbol(),
                    lhs: l.type_name(),
                    rhs: bad.type_name(),
                },
                span,
            ));
        }
        match op {
            Pow => Ok(Value::Float(l.as_f64().unwrap().powf(r.as_f64().unwrap()))),
            Div => Ok(Value::Float(l.as_f64().unwrap() / r.as_f64().unwrap())),
            Add => Ok(self.numeric_binop(l, r, |a, b| a.wrapping_add(b), |a, b| a + b)),
            Sub => Ok(self.numeric_binop(l, r, |a, b| a.wrapping_sub(b), |a, b| a - b)),
            Mul => Ok(self.numeric_binop(l, r, |a, b| a.wrapping_mul(b), |a, b| a * b)),
            FloorDiv => {
                if let (Value::Integer(a), Value::Integer(b)) = (&l, &r) {
                    if *b == 0 {
                        return Err(self.err(RuntimeError::DivisionByZero("//"), span));
                    }
                    return Ok(Value::Integer(floor_div_i64(*a, *b)));
                }
                let a = l.as_f64().unwrap();
                let b = r.as_f64().unwrap();
                Ok(Value::Float((a / b).floor()))
            }
            Mod => {
                if let (Value::Integer(a), Value::Integer(b)) = (&l, &r) {
                    if *b == 0 {
                        return Err(self.err(RuntimeError::DivisionByZero("%"), span));
                    }
                    return Ok(Value::Integer(floor_mod_i64(*a, *b)));
                }
                let a = l.as_f64().unwrap();
                let b = r.as_f64().unwrap();
                Ok(Value::Float(a - (a / b).floor() * b))
            }
            _ => unreachable!(),
        }
    }

    fn numeric_binop(
        &self,
        l: Value,
        r: Value,
        int_op: impl Fn(i64, i64) -> i64,
        float_op: impl Fn(f64, f64) -> f64,
    ) -> Value {
        match (&l, &r) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(int_op(*a, *b)),
            _ => Value::Float(float_op(l.as_f64().unwrap(), r.as_f64().unwrap())),
        }
    }

    fn concat(&self, l: Value, r: Value, span: Span) -> Result<Value, EvalError> {
        let ls = concat_operand(&l)
            .ok_or_else(|| self.err(RuntimeError::NonConcatable(l.type_name()), span))?;
        let rs = concat_operand(&r)
            .ok_or_else(|| self.err(RuntimeError::NonConcatable(r.type_name()), span))?;
        Ok(Value::str(format!("{}{}", ls, rs)))
    }

    fn compare(&self, op: BinaryOp, l: Value, r: Value, span: Span) -> Result<Value, EvalError> {
        use BinaryOp::*;
        let ordering = match (&l, &r) {
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                l.as_f64().unwrap().partial_cmp(&r.as_f64().unwrap())
            }
            (Value::Str(a), Value::Str(b)) => Some(a.as_ref().cmp(b.as_ref())),
            _ => {
                return Err(self.err(
                    RuntimeError::Incomparable {
                        lhs: l.type_name(),
                        rhs: r.type_name(),
                    },
                    span,
                ))
            }
        };
        let Some(ordering) = ordering else {
            return Ok(Value::Boolean(false)); // NaN comparisons
        };
        use std::cmp::Ordering::*;
        let result = match op {
            Lt => ordering == Less,
            LtEq => ordering != Greater,
            Gt => ordering == Greater,
            GtEq => ordering != Less,
            _ => unreachable!(),
        };
        Ok(Value::Boolean(result))
    }

    fn eval_unary(
        &mut self,
        operator: UnaryOp,
        argument: &Expression,
        span: Span,
        env: &Env,
    ) -> Result<Value, EvalError> {
        let value = self.eval_expr(argument, env)?;
        match operator {
            UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
            UnaryOp::Neg => match value {
                Value::Integer(i) => Ok(Value::Integer(i.wrapping_neg())),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(self.err(
                    RuntimeError::TypeMismatch {
                        op: "-",
                        lhs: other.type_name(),
                        rhs: other.type_name(),
                    },
                    span,
                )),
            },
            UnaryOp::Len => match &value {
                Value::Str(s) => Ok(Value::Integer(s.len() as i64)),
                Value::Table(t) => Ok(Value::Integer(t.borrow().len())),
                other => Err(self.err(RuntimeError::IndexOnNonIndexable(other.type_name()), span)),
            },
        }
    }

    fn eval_table_constructor(&mut self, fields: &[TableField], env: &Env) -> Result<Value, EvalError> {
        let mut table = Table::new();
        let mut array_index: i64 = 1;
        for (i, field) in fields.iter().enumerate() {
            let is_last = i + 1 == fields.len();
            match field {
                TableField::Array(expr) => {
                    if is_last {
                        for value in self.eval_expr_multi(expr, env)? {
                            table.set(Value::Integer(array_index), value);
                            array_index += 1;
                        }
                    } else {
                        let value = self.eval_expr(expr, env)?;
                        table.set(Value::Integer(array_index), value);
                        array_index += 1;
                    }
                }
                TableField::Named(key, expr) => {
                    let value = self.eval_expr(expr, env)?;
                    table.set(Value::str(key.name.clone()), value);
                }
                TableField::Computed(key_expr, expr) => {
                    let key = self.eval_expr(key_expr, env)?;
                    let value = self.eval_expr(expr, env)?;
                    table.set(key, value);
                }
            }
        }
        Ok(Value::table(table))
    }
}

fn concat_operand(v: &Value) -> Option<String> {
    match v {
        Value::Str(s) => Some(s.to_string()),
        Value::Integer(_) | Value::Float(_) => Some(v.to_string()),
        _ => None,
    }
}

fn literal_to_value(lit: &Literal) -> Value {
    match &lit.value {
        LiteralValue::Integer(i) => Value::Integer(*i),
        LiteralValue::Float(f) => Value::Float(*f),
        LiteralValue::Str(s) => Value::str(s.clone()),
        LiteralValue::Bool(b) => Value::Boolean(*b),
        LiteralValue::Nil => Value::Nil,
    }
}

fn floor_div_i64(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    let r = a.wrapping_rem(b);
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn floor_mod_i64(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

/// Lua-style `tostring`: delegates to `Value`'s `Display`, which already
/// implements the canonical number/table/function rendering used both here
/// and by the printer's literal formatting.
pub fn tostring(value: &Value) -> String {
    value.to_string()
}

/// Runs `program` to completion with a fresh global environment and
/// standard library, writing `print` output to `output`. This is the
/// `evaluate` entry point from §6: returns whether execution completed
/// without a runtime fault, the top-level `return`'s values (if any), and a
/// rendered diagnostic on failure.
pub fn evaluate(
    program: &Program,
    options: EvaluatorOptions,
    output: Rc<RefCell<dyn Write>>,
) -> (bool, Vec<Value>, Diagnostics) {
    let mut evaluator = Evaluator::new(options, output);
    let mut diagnostics = Diagnostics::new();
    match evaluator.run(program) {
        Ok(values) => (true, values, diagnostics),
        Err(e) => {
            diagnostics.error(e.kind.to_string(), e.span, "evaluator");
            (false, Vec::new(), diagnostics)
        }
    }
}
