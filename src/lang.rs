//! The expression capability the attribute compiler depends on.
//!
//! The tokenizer only needs something that turns the text between `${` and
//! `}` into an evaluable tree ([`ExprParser`]); the attribute evaluator only
//! needs that tree to evaluate itself against a scope ([`ExprTree`]). Any
//! expression language can sit behind these two traits. [`Lang`] is the one
//! this crate ships, backed by [`parse_expr`](crate::parse_expr) and
//! [`eval_expr`](crate::eval_expr).

use std::fmt;
use std::sync::Arc;

use crate::ast::expr::Expr;
use crate::ast::pos::Pos;
use crate::ast::value::Value;
use crate::error::{CompileError, EvalError};
use crate::eval::{Scope, eval_expr};
use crate::parser::parse_expr;
use crate::registry::Registry;

/// Parses one embedded expression span into an evaluable tree.
pub trait ExprParser: Send + Sync {
    /// `start` is the absolute position of `source`'s first character.
    /// Errors must carry absolute positions too.
    fn parse(&self, source: &str, start: Pos) -> Result<Arc<dyn ExprTree>, CompileError>;
}

/// A compiled expression.
///
/// Trees are built once and then shared, read-only, by every render, so
/// implementations must be `Send + Sync` and must not mutate themselves
/// during evaluation.
pub trait ExprTree: Send + Sync + fmt::Debug {
    fn evaluate(&self, scope: &dyn Scope) -> Result<Value, EvalError>;
}

/// The default expression language.
///
/// ```rust
/// use tagtpl::{ExprParser, Lang, Pos, SimpleScope, Value};
///
/// let lang = Lang::new();
/// let tree = lang.parse("upper(name) + '!'", Pos::start()).unwrap();
/// let scope = SimpleScope::new().with("name", "ann");
/// assert_eq!(tree.evaluate(&scope).unwrap(), Value::from("ANN!"));
/// ```
#[derive(Debug, Clone)]
pub struct Lang {
    registry: Arc<Registry>,
}

impl Lang {
    /// A language whose function calls resolve against
    /// [`Registry::with_builtins`].
    pub fn new() -> Self {
        Self::with_registry(Registry::with_builtins())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Lang {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprParser for Lang {
    fn parse(&self, source: &str, start: Pos) -> Result<Arc<dyn ExprTree>, CompileError> {
        let expr = parse_expr(source, start)?;
        Ok(Arc::new(CompiledExpr {
            expr,
            registry: Arc::clone(&self.registry),
        }))
    }
}

/// A parsed [`Expr`] bound to the registry it was compiled with.
pub struct CompiledExpr {
    expr: Expr,
    registry: Arc<Registry>,
}

impl CompiledExpr {
    /// Access the underlying AST for inspection.
    pub fn ast(&self) -> &Expr {
        &self.expr
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr").field("expr", &self.expr).finish()
    }
}

impl ExprTree for CompiledExpr {
    fn evaluate(&self, scope: &dyn Scope) -> Result<Value, EvalError> {
        eval_expr(&self.expr, scope, &self.registry)
    }
}
