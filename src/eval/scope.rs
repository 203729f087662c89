use std::collections::{BTreeMap, HashMap};

use crate::ast::value::Value;

/// Read-only name bindings an expression is evaluated against.
///
/// The caller owns the scope for the duration of one evaluation. Nothing in
/// this crate keeps a reference to it past the call, and nothing mutates it,
/// so the same compiled attribute can be evaluated against many scopes at
/// once.
///
/// `()` is the empty scope: every lookup misses.
pub trait Scope {
    /// Look up a binding by name.
    ///
    /// Return `None` if the name is not bound. The evaluator turns that into
    /// an "undefined variable" error.
    fn resolve(&self, name: &str) -> Option<Value>;
}

/// A minimal [`Scope`] backed by an in-memory map.
///
/// ```rust
/// use tagtpl::{Scope, SimpleScope, Value};
///
/// let scope = SimpleScope::new().with("name", "Ann").with("count", 3i64);
/// assert_eq!(scope.resolve("name"), Some(Value::from("Ann")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimpleScope {
    variables: HashMap<String, Value>,
}

impl SimpleScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable. Accepts anything that implements `Into<Value>`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.variables.insert(name.to_string(), value.into());
    }

    /// Builder form of [`set`](SimpleScope::set).
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }
}

impl Scope for SimpleScope {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }
}

impl Scope for () {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl Scope for HashMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Scope for BTreeMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<S: Scope + ?Sized> Scope for &S {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }
}
