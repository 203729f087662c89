//! # tagtpl
//!
//! Markup attribute values with embedded `${expr}` placeholders. A value is
//! compiled once into literal and expression segments and then evaluated
//! against a per-render [`Scope`] as many times as needed, from as many
//! threads as needed.
//!
//! The crate is split into layers:
//!
//! - **Attributes** ([`html`]): tokenizing values, evaluating them, printing
//!   them back. These depend on an expression language only through the
//!   [`ExprParser`] and [`ExprTree`] traits.
//! - **The default expression language** ([`Lang`]): a pest grammar with
//!   variables, member access, operators, and [`Registry`] functions.
//! - **The render pipeline** ([`render`]): template lookup, hot reload, and
//!   content-type handling around compiled templates.
//!
//! ## Quick start
//!
//! ```rust
//! use tagtpl::{expand, SimpleScope};
//!
//! let scope = SimpleScope::new().with("name", "Ann");
//! assert_eq!(expand("hi ${name}", &scope).unwrap(), "hi Ann");
//! ```
//!
//! ## Compiled attributes
//!
//! For repeated evaluation, compile once with [`Attribute::parse`] or
//! [`Attribute::compile`] and call [`Attribute::evaluate`] per render:
//!
//! ```rust
//! use tagtpl::{Attribute, Lang, Pos, SimpleScope};
//!
//! let lang = Lang::new();
//! let attr = Attribute::parse("class=${a}-${b}", Pos::start(), &lang).unwrap();
//!
//! let scope = SimpleScope::new().with("a", 1i64).with("b", 2i64);
//! assert_eq!(attr.evaluate(&scope).unwrap(), "1-2");
//!
//! let scope = SimpleScope::new().with("a", "x").with("b", "y");
//! assert_eq!(attr.evaluate(&scope).unwrap(), "x-y");
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod html;
pub mod lang;
mod parser;
pub mod registry;
pub mod render;

pub use ast::pos::{Pos, Span, Spanned};
pub use ast::value::Value;
pub use error::{CompileError, EvalError, EvalErrorKind, RenderError};
pub use eval::{Scope, SimpleScope, eval_expr};
pub use html::{Attribute, CodeToken, Delimiters, Element};
pub use lang::{CompiledExpr, ExprParser, ExprTree, Lang};
pub use parser::parse_expr;
pub use registry::{ClosureFunction, ExprFunction, Registry};
pub use render::{
    BuildReason, Factory, HTML_CONTENT_TYPE, HtmlRender, RenderOptions, Rendered, Template,
    TemplateManager, TemplateSet, factory, render_to_string,
};

/// Compile a value with the default language and evaluate it in one step.
///
/// For repeated evaluation of the same value, compile an [`Attribute`]
/// instead to avoid re-tokenizing.
pub fn expand(value: &str, scope: &dyn Scope) -> Result<String, RenderError> {
    let attr = Attribute::compile("value", Pos::start(), Some((value, Pos::start())), &Lang::new())?;
    Ok(attr.evaluate(scope)?)
}
