//! Error types for compiling, evaluating, and rendering.
//!
//! [`CompileError`] is produced while tokenizing an attribute value or
//! parsing an embedded expression, and carries the [`Pos`] of the offending
//! text. [`EvalError`] is produced while evaluating an attribute against a
//! scope. [`RenderError`] is what the render pipeline surfaces, wrapping the
//! other two plus sink and lookup failures.

use crate::ast::pos::Pos;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ── Compile errors ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
#[error("{pos}: {message}")]
pub struct CompileError {
    pub pos: Pos,
    pub message: String,
    pub hint: Option<String>,
}

impl CompileError {
    pub fn new(pos: Pos, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn unterminated(pos: Pos, close: &str) -> Self {
        Self::new(pos, "unterminated expression")
            .with_hint(format!("close the expression with `{close}`"))
    }

    /// Format the error with the line of `source` it points into.
    ///
    /// `source` must be the document the error's positions are relative to.
    pub fn format_with_source(&self, source: &str, entry_name: Option<&str>) -> String {
        let line = self.pos.line;
        let col = self.pos.column;
        let source_line = source.lines().nth(line.saturating_sub(1)).unwrap_or("");

        let location = if let Some(name) = entry_name {
            format!(" --> {name}:{line}:{col}")
        } else {
            format!(" --> {line}:{col}")
        };

        let pointer = " ".repeat(col.saturating_sub(1)) + "^";

        let mut output = format!(
            "Error: {}\n{location}\n  |\n{line:>3} | {source_line}\n    | {pointer}",
            self.message
        );

        if let Some(hint) = &self.hint {
            output.push_str(&format!("\n  = hint: {hint}"));
        }

        output
    }
}

// ── Eval errors ─────────────────────────────────────────────────────────

/// An error that occurs while evaluating an attribute value.
///
/// Carries a structured [`EvalErrorKind`], a message, the [`Pos`] of the
/// expression that failed (when known), and an optional underlying cause.
///
/// Host functions registered in the [`Registry`](crate::Registry) can keep
/// the original error chain with [`with_source`](EvalError::with_source):
///
/// ```rust
/// use tagtpl::EvalError;
///
/// fn example() -> Result<(), EvalError> {
///     let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
///     Err(EvalError::host_error("failed to load asset").with_source(io_err))
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub pos: Option<Pos>,
    pub message: String,
    /// Wrapped in `Arc` so that `EvalError` remains `Clone`.
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            pos: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_pos(mut self, pos: Pos) -> Self {
        self.pos = Some(pos);
        self
    }

    /// Set `pos` only if no position has been recorded yet.
    pub fn or_pos(self, pos: Pos) -> Self {
        if self.pos.is_none() {
            self.with_pos(pos)
        } else {
            self
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    // Convenience constructors for common error types

    pub fn no_value(attr: &str) -> Self {
        Self::new(EvalErrorKind::NoValue, format!("no value: attribute `{attr}`"))
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UndefinedVariable,
            format!("undefined variable: {name}"),
        )
    }

    pub fn undefined_member(target: &str, name: &str) -> Self {
        Self::new(
            EvalErrorKind::UndefinedVariable,
            format!("{target} has no member `{name}`"),
        )
    }

    pub fn undefined_function(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UndefinedFunction,
            format!("undefined function: {name}"),
        )
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(
            EvalErrorKind::TypeError,
            format!("expected {expected}, got {got}"),
        )
    }

    pub fn host_error(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::HostError, message)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "{pos}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// A valueless (boolean) attribute was evaluated as a string.
    NoValue,
    UndefinedVariable,
    UndefinedFunction,
    TypeError,
    ArithmeticError,
    HostError,
}

// ── Render errors ───────────────────────────────────────────────────────

/// Error surfaced by the render pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// Writing to the output sink failed.
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// The template manager factory could not build a manager.
    #[error("template build failed: {0}")]
    Build(String),
}
