//! Functions callable from embedded expressions.
//!
//! The [`Registry`] maps names to [`ExprFunction`]s. An expression such as
//! `${upper(name)}` evaluates its arguments, then dispatches `upper` through
//! the registry the expression was compiled with.
//!
//! There are two ways to register a function:
//!
//! - **Closure-based**: wrap a closure in [`ClosureFunction`].
//! - **Trait-based**: implement [`ExprFunction`] directly when the function
//!   carries its own state.

use crate::ast::value::Value;
use crate::error::{EvalError, EvalErrorKind};
use std::collections::HashMap;

/// A callable function, invoked via `name(args)` in expressions.
///
/// Functions are pure: they receive the evaluated positional arguments and
/// nothing else. They must be `Send + Sync` because one registry is shared by
/// every render.
pub trait ExprFunction: Send + Sync {
    fn call(&self, args: Vec<Value>) -> Result<Value, EvalError>;

    fn name(&self) -> &str;
}

/// Stores registered functions for use during evaluation.
///
/// ```rust
/// use tagtpl::{ClosureFunction, Registry, Value};
///
/// let mut registry = Registry::new();
/// registry.register(ClosureFunction::new("twice", |args| {
///     let n = args.first().and_then(|v| v.as_number()).unwrap_or(0.0);
///     Ok(Value::Number(n * 2.0))
/// }));
/// assert!(registry.contains("twice"));
/// ```
pub struct Registry {
    functions: HashMap<String, Box<dyn ExprFunction>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// A registry preloaded with `upper`, `lower`, `len`, `join` and
    /// `default`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ClosureFunction::new("upper", |args| {
            Ok(Value::String(single_string("upper", &args)?.to_uppercase()))
        }));
        registry.register(ClosureFunction::new("lower", |args| {
            Ok(Value::String(single_string("lower", &args)?.to_lowercase()))
        }));
        registry.register(ClosureFunction::new("len", builtin_len));
        registry.register(ClosureFunction::new("join", builtin_join));
        registry.register(ClosureFunction::new("default", |args| {
            expect_arity("default", &args, 2)?;
            let mut args = args.into_iter();
            let value = args.next().unwrap_or(Value::None);
            let fallback = args.next().unwrap_or(Value::None);
            Ok(if value.is_truthy() { value } else { fallback })
        }));
        registry
    }

    /// Register a function. A function with the same name is replaced.
    pub fn register(&mut self, func: impl ExprFunction + 'static) {
        self.functions.insert(func.name().to_string(), Box::new(func));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Dispatch a call. Returns [`EvalError`] if `name` is not registered.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        match self.functions.get(name) {
            Some(func) => func.call(args),
            None => Err(EvalError::undefined_function(name)),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("functions", &names).finish()
    }
}

// ── Closure-based convenience wrapper ───────────────────────────────────

/// An [`ExprFunction`] backed by a closure.
///
/// ```rust
/// use tagtpl::{ClosureFunction, Value};
///
/// let greet = ClosureFunction::new("greet", |args| {
///     let name = args.first().and_then(|v| v.as_string()).unwrap_or("world");
///     Ok(Value::String(format!("Hello, {name}!")))
/// });
/// ```
pub struct ClosureFunction<F>
where
    F: Fn(Vec<Value>) -> Result<Value, EvalError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> ClosureFunction<F>
where
    F: Fn(Vec<Value>) -> Result<Value, EvalError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> ExprFunction for ClosureFunction<F>
where
    F: Fn(Vec<Value>) -> Result<Value, EvalError> + Send + Sync,
{
    fn call(&self, args: Vec<Value>) -> Result<Value, EvalError> {
        (self.func)(args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ── Builtins ────────────────────────────────────────────────────────────

fn expect_arity(name: &str, args: &[Value], n: usize) -> Result<(), EvalError> {
    if args.len() == n {
        Ok(())
    } else {
        Err(EvalError::new(
            EvalErrorKind::TypeError,
            format!("{name} expects {n} argument(s), got {}", args.len()),
        ))
    }
}

fn single_string(name: &str, args: &[Value]) -> Result<String, EvalError> {
    expect_arity(name, args, 1)?;
    Ok(args[0].to_output_string())
}

fn builtin_len(args: Vec<Value>) -> Result<Value, EvalError> {
    expect_arity("len", &args, 1)?;
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(a) => a.len(),
        Value::Map(m) => m.len(),
        other => return Err(EvalError::type_error("string, array or map", other.type_name())),
    };
    Ok(Value::Number(n as f64))
}

fn builtin_join(args: Vec<Value>) -> Result<Value, EvalError> {
    expect_arity("join", &args, 2)?;
    let items = args[0]
        .as_array()
        .ok_or_else(|| EvalError::type_error("array", args[0].type_name()))?;
    let sep = args[1].to_output_string();
    let joined = items
        .iter()
        .map(Value::to_output_string)
        .collect::<Vec<_>>()
        .join(&sep);
    Ok(Value::String(joined))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let registry = Registry::with_builtins();
        assert_eq!(
            registry.call("upper", vec!["ann".into()]).unwrap(),
            Value::from("ANN")
        );
        assert_eq!(
            registry.call("len", vec![vec![1i64, 2, 3].into()]).unwrap(),
            Value::Number(3.0)
        );
        assert_eq!(
            registry
                .call("join", vec![vec!["a", "b"].into(), "-".into()])
                .unwrap(),
            Value::from("a-b")
        );
        assert_eq!(
            registry
                .call("default", vec![Value::None, "anon".into()])
                .unwrap(),
            Value::from("anon")
        );
    }

    #[test]
    fn test_unknown_function() {
        let err = Registry::new().call("nope", vec![]).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UndefinedFunction);
    }

    #[test]
    fn test_arity_checked() {
        let err = Registry::with_builtins().call("upper", vec![]).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::TypeError);
        assert!(err.message.contains("expects 1"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = Registry::with_builtins();
        registry.register(ClosureFunction::new("upper", |_| Ok(Value::from("x"))));
        assert_eq!(registry.call("upper", vec![]).unwrap(), Value::from("x"));
    }
}
