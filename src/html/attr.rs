use std::fmt;
use std::io;

use crate::ast::pos::{Pos, Span};
use crate::error::{CompileError, EvalError};
use crate::eval::Scope;
use crate::html::token::CodeToken;
use crate::html::tokenizer::{self, Delimiters};
use crate::lang::ExprParser;

/// A compiled markup attribute: a name, an optional raw value, and the
/// tokens of that value if it embeds expressions.
///
/// Attributes are built once by [`compile`](Attribute::compile) or
/// [`parse`](Attribute::parse) and never change afterwards, so a single
/// attribute may be evaluated by any number of renders at the same time.
///
/// ```rust
/// use tagtpl::{Attribute, Lang, Pos, SimpleScope};
///
/// let lang = Lang::new();
/// let attr = Attribute::parse(r#"title="hi ${name}""#, Pos::start(), &lang).unwrap();
/// let scope = SimpleScope::new().with("name", "Ann");
/// assert_eq!(attr.evaluate(&scope).unwrap(), "hi Ann");
/// assert_eq!(attr.to_string(), "1:1|title|1:6=1:8|hi ${name}|1:18");
/// ```
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    name_start: Pos,
    name_end: Pos,
    value: Option<String>,
    value_start: Pos,
    value_end: Pos,
    value_tokens: Vec<CodeToken>,
    delims: Delimiters,
}

impl Attribute {
    /// Compile an attribute from its parts with the default delimiters.
    ///
    /// `value` is the raw (unquoted) value text and the position of its
    /// first character.
    pub fn compile(
        name: impl Into<String>,
        name_start: Pos,
        value: Option<(&str, Pos)>,
        parser: &dyn ExprParser,
    ) -> Result<Self, CompileError> {
        Self::compile_with(name, name_start, value, parser, &Delimiters::default())
    }

    pub fn compile_with(
        name: impl Into<String>,
        name_start: Pos,
        value: Option<(&str, Pos)>,
        parser: &dyn ExprParser,
        delims: &Delimiters,
    ) -> Result<Self, CompileError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CompileError::new(name_start, "attribute name is empty"));
        }
        let name_end = name_start.advance(&name);

        let (value, value_start, value_end, value_tokens) = match value {
            Some((raw, start)) => {
                let tokens = tokenizer::tokenize(raw, start, parser, delims)?;
                (Some(raw.to_string()), start, start.advance(raw), tokens)
            }
            None => (None, name_end, name_end, Vec::new()),
        };

        let attr = Self {
            name,
            name_start,
            name_end,
            value,
            value_start,
            value_end,
            value_tokens,
            delims: delims.clone(),
        };
        tracing::trace!(attr = %attr, tokens = attr.value_tokens.len(), "compiled attribute");
        Ok(attr)
    }

    /// Parse a single attribute from markup source: `name`, `name=value`,
    /// `name="value"` or `name='value'`, starting at `start`.
    ///
    /// Quotes are not part of the value; the value span covers the text
    /// between them.
    pub fn parse(source: &str, start: Pos, parser: &dyn ExprParser) -> Result<Self, CompileError> {
        Self::parse_with(source, start, parser, &Delimiters::default())
    }

    pub fn parse_with(
        source: &str,
        start: Pos,
        parser: &dyn ExprParser,
        delims: &Delimiters,
    ) -> Result<Self, CompileError> {
        let name_len = source
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(source.len());
        let name = &source[..name_len];
        let rest = &source[name_len..];
        let after_name = start.advance(name);

        if rest.is_empty() {
            return Self::compile_with(name, start, None, parser, delims);
        }

        let Some(raw) = rest.strip_prefix('=') else {
            return Err(CompileError::new(
                after_name,
                format!("unexpected `{}` after attribute name", rest.trim_end()),
            ));
        };
        let raw_start = after_name.advance("=");

        let (value, value_start) = match raw.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &raw[1..];
                if !body.ends_with(quote) {
                    return Err(CompileError::new(raw_start, "unterminated quoted value")
                        .with_hint(format!("close the value with `{quote}`")));
                }
                (&body[..body.len() - 1], raw_start.advance(&raw[..1]))
            }
            _ => (raw, raw_start),
        };

        Self::compile_with(name, start, Some((value, value_start)), parser, delims)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_span(&self) -> Span {
        Span::new(self.name_start, self.name_end)
    }

    /// The raw value, or `None` for a valueless (boolean) attribute.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Span of the raw value text. Empty and placed at the end of the name
    /// when there is no value.
    pub fn value_span(&self) -> Span {
        Span::new(self.value_start, self.value_end)
    }

    /// Empty when the value is absent or contains no expressions.
    pub fn value_tokens(&self) -> &[CodeToken] {
        &self.value_tokens
    }

    /// Whether evaluation needs a scope at all.
    pub fn is_static(&self) -> bool {
        self.value_tokens.is_empty()
    }

    /// Rebuild the raw value from the compiled tokens. Equal to
    /// [`value`](Attribute::value) for every successfully compiled attribute.
    pub fn reconstruct(&self) -> Option<String> {
        let raw = self.value.as_ref()?;
        if self.value_tokens.is_empty() {
            return Some(raw.clone());
        }
        Some(tokenizer::reconstruct(&self.value_tokens, &self.delims))
    }

    /// Evaluate the value against `scope`.
    ///
    /// A valueless attribute is an error. A value without expressions is
    /// returned as-is without touching the scope. Otherwise literals and
    /// evaluated expressions are concatenated in order; the first failing
    /// expression aborts the whole evaluation and its error is returned.
    pub fn evaluate(&self, scope: &dyn Scope) -> Result<String, EvalError> {
        let Some(raw) = &self.value else {
            return Err(EvalError::no_value(&self.name).with_pos(self.name_start));
        };
        if self.value_tokens.is_empty() {
            return Ok(raw.clone());
        }

        let mut buf = String::with_capacity(raw.len());
        for tok in &self.value_tokens {
            match tok {
                CodeToken::Literal { text, .. } => buf.push_str(text),
                CodeToken::CodeValue { tree, start, .. } => {
                    let value = tree.evaluate(scope).map_err(|e| e.or_pos(*start))?;
                    buf.push_str(&value.to_string());
                }
                CodeToken::BegEnd { .. } | CodeToken::CodeStart { .. } | CodeToken::CodeEnd { .. } => {}
            }
        }
        Ok(buf)
    }

    /// Write the attribute in its source form: ` name` or ` name=value`.
    ///
    /// The raw value is written, not the evaluated one.
    pub fn print(&self, w: &mut impl io::Write) -> io::Result<()> {
        w.write_all(b" ")?;
        w.write_all(self.name.as_bytes())?;
        if let Some(value) = &self.value {
            w.write_all(b"=")?;
            w.write_all(value.as_bytes())?;
        }
        Ok(())
    }
}

/// `<NameStart>|<Name>|<NameEnd>[=<ValueStart>|<Value>|<ValueEnd>]`
impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.name_start, self.name, self.name_end)?;
        if let Some(value) = &self.value {
            write!(f, "={}|{}|{}", self.value_start, value, self.value_end)?;
        }
        Ok(())
    }
}
