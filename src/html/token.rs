use std::sync::Arc;

use crate::ast::pos::{Pos, Span};
use crate::lang::ExprTree;

/// One classified fragment of a tokenized attribute value.
///
/// Given `class="btn ${kind}"`, the value `btn ${kind}` becomes
/// `Literal("btn "), CodeStart, CodeValue(kind), CodeEnd`.
#[derive(Debug, Clone)]
pub enum CodeToken {
    /// A zero-width value boundary. Carries no text and renders nothing.
    BegEnd { pos: Pos },

    /// Plain text, copied to the output verbatim.
    Literal { text: String, span: Span },

    /// The opening delimiter, `${` by default.
    CodeStart { span: Span },

    /// A compiled expression. `source` is the raw text between the
    /// delimiters, `start` the position of its first character and the
    /// anchor for evaluation errors.
    CodeValue {
        tree: Arc<dyn ExprTree>,
        source: String,
        start: Pos,
    },

    /// The closing delimiter, `}` by default.
    CodeEnd { span: Span },
}

impl CodeToken {
    /// Short kind name, for diagnostics and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            CodeToken::BegEnd { .. } => "BegEnd",
            CodeToken::Literal { .. } => "Literal",
            CodeToken::CodeStart { .. } => "CodeStart",
            CodeToken::CodeValue { .. } => "CodeValue",
            CodeToken::CodeEnd { .. } => "CodeEnd",
        }
    }

    /// Where this token begins.
    pub fn start(&self) -> Pos {
        match self {
            CodeToken::BegEnd { pos } => *pos,
            CodeToken::Literal { span, .. }
            | CodeToken::CodeStart { span }
            | CodeToken::CodeEnd { span } => span.start,
            CodeToken::CodeValue { start, .. } => *start,
        }
    }
}
