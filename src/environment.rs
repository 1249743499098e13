//! Lexical environments: a name-to-value map plus an optional parent link.
//!
//! A fresh environment is created per call, per block, and per program.
//! Closures own a shared handle (`Env`) to the environment in effect at
//! their point of definition; no cycles arise because closures only ever
//! reference a parent, never the environment in which they themselves live.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type Env = Rc<RefCell<Scope>>;

pub struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
}

impl Scope {
    pub fn root() -> Env {
        Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: None,
        }))
    }

    pub fn child(parent: &Env) -> Env {
        Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Binds `name` in this scope, shadowing any binding of the same name in
    /// an ancestor scope. Used for `local` declarations and parameter binds.
    pub fn define(env: &Env, name: &str, value: Value) {
        env.borrow_mut().vars.insert(name.to_string(), value);
    }

    /// Looks up `name` by walking the parent chain; returns `Nil` rather
    /// than an error when absent and the caller is in non-strict mode (the
    /// caller decides whether absence should instead raise).
    pub fn get(env: &Env, name: &str) -> Option<Value> {
        if let Some(v) = env.borrow().vars.get(name) {
            return Some(v.clone());
        }
        let parent = env.borrow().parent.clone();
        match parent {
            Some(p) => Scope::get(&p, name),
            None => None,
        }
    }

    /// Assigns to the nearest enclosing binding of `name`, or creates one in
    /// the outermost (global) scope if no binding exists anywhere in the
    /// chain.
    pub fn assign(env: &Env, name: &str, value: Value) {
        if env.borrow().vars.contains_key(name) {
            env.borrow_mut().vars.insert(name.to_string(), value);
            return;
        }
        let parent = env.borrow().parent.clone();
        match parent {
            Some(p) => Scope::assign(&p, name, value),
            None => {
                env.borrow_mut().vars.insert(name.to_string(), value);
            }
        }
    }

    /// The outermost scope in the chain starting at `env`, used to install
    /// the standard library and to resolve writes that fall through every
    /// enclosing local scope.
    pub fn global_of(env: &Env) -> Env {
        let parent = env.borrow().parent.clone();
        match parent {
            Some(p) => Scope::global_of(&p),
            None => Rc::clone(env),
        }
    }
}
