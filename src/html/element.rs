use std::io;

use crate::error::RenderError;
use crate::eval::Scope;
use crate::html::attr::Attribute;
use crate::render::Template;

/// A start tag: an element name and its compiled attributes.
///
/// This is the smallest unit of markup that can be rendered. Building a
/// tree of elements is left to whatever parses the surrounding document.
///
/// ```rust
/// use tagtpl::{render_to_string, Attribute, Element, Lang, Pos, SimpleScope};
///
/// let lang = Lang::new();
/// let el = Element::new("a")
///     .with_attr(Attribute::parse("href=/u/${id}", Pos::start(), &lang).unwrap())
///     .with_attr(Attribute::parse("download", Pos::start(), &lang).unwrap());
///
/// let out = render_to_string(&el, &SimpleScope::new().with("id", 7i64)).unwrap();
/// assert_eq!(out, r#"<a href="/u/7" download>"#);
/// ```
#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    attrs: Vec<Attribute>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, attr: Attribute) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Write the tag as it appeared in source, values unevaluated.
    pub fn print(&self, w: &mut impl io::Write) -> io::Result<()> {
        w.write_all(b"<")?;
        w.write_all(self.name.as_bytes())?;
        for attr in &self.attrs {
            attr.print(w)?;
        }
        w.write_all(b">")
    }

    /// Evaluate every attribute, then build the tag. Nothing is produced if
    /// any attribute fails.
    pub fn render(&self, data: &dyn Scope) -> Result<String, RenderError> {
        let mut out = format!("<{}", self.name);
        for attr in &self.attrs {
            out.push(' ');
            out.push_str(attr.name());
            if attr.value().is_some() {
                let value = attr.evaluate(data)?;
                out.push_str("=\"");
                escape_attr_value(&value, &mut out);
                out.push('"');
            }
        }
        out.push('>');
        Ok(out)
    }
}

impl Template for Element {
    fn execute(&self, w: &mut dyn io::Write, data: &dyn Scope) -> Result<(), RenderError> {
        let out = self.render(data)?;
        w.write_all(out.as_bytes())?;
        Ok(())
    }
}

fn escape_attr_value(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::pos::Pos;
    use crate::eval::SimpleScope;
    use crate::lang::Lang;

    fn element() -> Element {
        let lang = Lang::new();
        Element::new("input")
            .with_attr(Attribute::parse("value=${v}", Pos::start(), &lang).unwrap())
            .with_attr(Attribute::parse("checked", Pos::start(), &lang).unwrap())
    }

    #[test]
    fn test_render_escapes_values() {
        let out = element()
            .render(&SimpleScope::new().with("v", r#"a "b" & <c>"#))
            .unwrap();
        assert_eq!(out, r#"<input value="a &quot;b&quot; &amp; &lt;c&gt;" checked>"#);
    }

    #[test]
    fn test_print_is_structural() {
        let mut out = Vec::new();
        element().print(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<input value=${v} checked>");
    }

    #[test]
    fn test_execute_writes_nothing_on_error() {
        let mut out = Vec::new();
        let err = element().execute(&mut out, &()).unwrap_err();
        assert!(matches!(err, RenderError::Eval(_)));
        assert!(out.is_empty());
    }
}
