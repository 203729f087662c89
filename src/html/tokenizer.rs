//! Splits a raw attribute value into literal and expression tokens.

use std::borrow::Cow;

use crate::ast::pos::{Pos, Span};
use crate::error::CompileError;
use crate::html::token::CodeToken;
use crate::lang::ExprParser;

/// The markers that open and close an embedded expression.
///
/// ```rust
/// use tagtpl::Delimiters;
///
/// let d = Delimiters::default();
/// assert_eq!((d.open(), d.close()), ("${", "}"));
/// assert!(Delimiters::new("{{", "}}").is_some());
/// assert!(Delimiters::new("", "}").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    open: Cow<'static, str>,
    close: Cow<'static, str>,
}

impl Delimiters {
    /// Returns `None` if either marker is empty.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Option<Self> {
        let (open, close) = (open.into(), close.into());
        if open.is_empty() || close.is_empty() {
            return None;
        }
        Some(Self {
            open: Cow::Owned(open),
            close: Cow::Owned(close),
        })
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: Cow::Borrowed("${"),
            close: Cow::Borrowed("}"),
        }
    }
}

/// Tokenize `value`, whose first character sits at `start`.
///
/// A value without any open delimiter yields no tokens at all; callers use
/// the raw value directly. Otherwise text outside delimiters becomes
/// [`CodeToken::Literal`] and each delimited span is handed to `parser` and
/// wrapped in `CodeStart, CodeValue, CodeEnd`. The first close delimiter
/// after an open one ends the span; expressions do not nest.
///
/// An open delimiter with no close delimiter after it is an error anchored
/// at the open delimiter.
pub fn tokenize(
    value: &str,
    start: Pos,
    parser: &dyn ExprParser,
    delims: &Delimiters,
) -> Result<Vec<CodeToken>, CompileError> {
    let (open, close) = (delims.open(), delims.close());
    if !value.contains(open) {
        return Ok(Vec::new());
    }

    let mut tokens = Vec::new();
    let mut rest = value;
    let mut pos = start;

    while let Some(open_at) = rest.find(open) {
        if open_at > 0 {
            let text = &rest[..open_at];
            let span = Span::of(pos, text);
            tokens.push(CodeToken::Literal {
                text: text.to_string(),
                span,
            });
            pos = span.end;
        }

        let open_span = Span::of(pos, open);
        let after_open = &rest[open_at + open.len()..];
        let close_at = after_open
            .find(close)
            .ok_or_else(|| CompileError::unterminated(open_span.start, close))?;
        tokens.push(CodeToken::CodeStart { span: open_span });

        let source = &after_open[..close_at];
        let code_start = open_span.end;
        let tree = parser.parse(source, code_start)?;
        tokens.push(CodeToken::CodeValue {
            tree,
            source: source.to_string(),
            start: code_start,
        });

        let close_span = Span::of(code_start.advance(source), close);
        tokens.push(CodeToken::CodeEnd { span: close_span });

        pos = close_span.end;
        rest = &after_open[close_at + close.len()..];
    }

    if !rest.is_empty() {
        tokens.push(CodeToken::Literal {
            text: rest.to_string(),
            span: Span::of(pos, rest),
        });
    }

    Ok(tokens)
}

/// Rebuild the raw value from its tokens: literal text, delimiters, and the
/// expression sources between them.
pub fn reconstruct(tokens: &[CodeToken], delims: &Delimiters) -> String {
    let mut out = String::new();
    for tok in tokens {
        match tok {
            CodeToken::BegEnd { .. } => {}
            CodeToken::Literal { text, .. } => out.push_str(text),
            CodeToken::CodeStart { .. } => out.push_str(delims.open()),
            CodeToken::CodeValue { source, .. } => out.push_str(source),
            CodeToken::CodeEnd { .. } => out.push_str(delims.close()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Lang;

    fn kinds(tokens: &[CodeToken]) -> Vec<&'static str> {
        tokens.iter().map(CodeToken::kind).collect()
    }

    fn tok(value: &str) -> Result<Vec<CodeToken>, CompileError> {
        tokenize(value, Pos::start(), &Lang::new(), &Delimiters::default())
    }

    #[test]
    fn test_plain_value_has_no_tokens() {
        assert!(tok("hello").unwrap().is_empty());
        assert!(tok("").unwrap().is_empty());
        assert!(tok("a } b $ {").unwrap().is_empty());
    }

    #[test]
    fn test_literal_then_code() {
        let tokens = tok("hi ${name}").unwrap();
        assert_eq!(kinds(&tokens), ["Literal", "CodeStart", "CodeValue", "CodeEnd"]);
        match &tokens[0] {
            CodeToken::Literal { text, span } => {
                assert_eq!(text, "hi ");
                assert_eq!(span.start.column, 1);
                assert_eq!(span.end.column, 4);
            }
            other => panic!("expected literal, got {other:?}"),
        }
        match &tokens[2] {
            CodeToken::CodeValue { source, start, .. } => {
                assert_eq!(source, "name");
                assert_eq!(start.column, 6);
            }
            other => panic!("expected code value, got {other:?}"),
        }
        assert_eq!(tokens[3].start().column, 10);
    }

    #[test]
    fn test_only_delimiters() {
        let tokens = tok("${a}").unwrap();
        assert_eq!(kinds(&tokens), ["CodeStart", "CodeValue", "CodeEnd"]);
    }

    #[test]
    fn test_adjacent_expressions() {
        let tokens = tok("${a}-${b}!").unwrap();
        assert_eq!(
            kinds(&tokens),
            [
                "CodeStart", "CodeValue", "CodeEnd", "Literal", "CodeStart", "CodeValue",
                "CodeEnd", "Literal"
            ]
        );
    }

    #[test]
    fn test_round_trip() {
        for value in ["hi ${name}", "${a}-${b}", "x${ a + 1 }y${'q'}", "${a}\n${b}"] {
            let tokens = tok(value).unwrap();
            assert_eq!(reconstruct(&tokens, &Delimiters::default()), value);
        }
    }

    #[test]
    fn test_first_close_ends_span() {
        // `${'}'}` closes at the first `}`, leaving `'` as the expression.
        let err = tok("${'}'}").unwrap_err();
        assert!(err.message.starts_with("invalid expression"));
        assert!(err.pos.column >= 3);
    }

    #[test]
    fn test_unterminated_points_at_open_delimiter() {
        let err = tok("ab${unterminated").unwrap_err();
        assert_eq!(err.message, "unterminated expression");
        assert_eq!(err.pos, Pos::new(2, 1, 3));
    }

    #[test]
    fn test_empty_expression_rejected() {
        let err = tok("x${}").unwrap_err();
        assert_eq!(err.message, "empty expression");
        assert_eq!(err.pos.column, 4);
    }

    #[test]
    fn test_multiline_positions() {
        let tokens = tok("a\n  ${b}").unwrap();
        match &tokens[2] {
            CodeToken::CodeValue { start, .. } => {
                assert_eq!((start.line, start.column), (2, 5));
            }
            other => panic!("expected code value, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_delimiters() {
        let delims = Delimiters::new("{{", "}}").unwrap();
        let tokens = tokenize("a{{b}}", Pos::start(), &Lang::new(), &delims).unwrap();
        assert_eq!(kinds(&tokens), ["Literal", "CodeStart", "CodeValue", "CodeEnd"]);
        assert_eq!(reconstruct(&tokens, &delims), "a{{b}}");
        assert!(tokenize("${b}", Pos::start(), &Lang::new(), &delims).unwrap().is_empty());
    }
}
