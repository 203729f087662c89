use std::fmt;

/// A location in source text.
///
/// Stamped on every token and attribute span so that diagnostics can point
/// back to the exact character that caused a problem. `line` and `column`
/// are 1-based; `column` counts chars, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Position of the first character of a document.
    pub fn start() -> Self {
        Self::new(0, 1, 1)
    }

    /// The position reached after consuming `text` from `self`.
    pub fn advance(self, text: &str) -> Pos {
        let mut pos = self;
        for ch in text.chars() {
            pos.offset += ch.len_utf8();
            if ch == '\n' {
                pos.line += 1;
                pos.column = 1;
            } else {
                pos.column += 1;
            }
        }
        pos
    }
}

impl Default for Pos {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    /// The span covering `text` when it begins at `start`.
    pub fn of(start: Pos, text: &str) -> Self {
        Self::new(start, start.advance(text))
    }

    /// Merge two spans into one covering both ranges
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Wraps any AST node with its source location.
#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_counts_chars_and_lines() {
        let pos = Pos::start().advance("ab\ncé");
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 3);
        assert_eq!(pos.offset, 6);
        assert_eq!(pos.to_string(), "2:3");
    }

    #[test]
    fn test_ordering_follows_offset() {
        let a = Pos::start();
        let b = a.advance("x");
        assert!(a < b);
        assert_eq!(Span::new(b, b).merge(Span::new(a, a)), Span::new(a, b));
    }
}
