//! Source positions, runtime values, and the expression AST of the default
//! expression language.
//!
//! - [`pos`]: [`Pos`] and [`Span`], stamped on every token and attribute.
//! - [`value`]: [`Value`], what expressions evaluate to.
//! - [`expr`]: the tree produced by [`crate::parser::parse_expr`].

pub mod expr;
pub mod pos;
pub mod value;

// Convenience re-exports
pub use expr::*;
pub use pos::{Pos, Span, Spanned};
pub use value::Value;
