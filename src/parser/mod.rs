//! Expression parser, built on [pest](https://pest.rs/).
//!
//! The grammar is defined in `expr.pest`. This module converts pest's parse
//! tree into the typed AST defined in [`crate::ast::expr`], translating
//! pest's byte offsets into absolute [`Pos`]itions so that every node can be
//! traced back to its place in the surrounding markup.

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;

use crate::ast::expr::*;
use crate::ast::pos::{Pos, Span, Spanned};
use crate::ast::value::Value;
use crate::error::CompileError;

#[derive(Parser)]
#[grammar = "parser/expr.pest"]
struct GrammarParser;

/// Parse one embedded expression.
///
/// `start` is the position of the first character of `source` in the
/// enclosing document; all spans in the returned tree and any error are
/// absolute.
///
/// ```rust
/// use tagtpl::{parse_expr, Pos};
///
/// let expr = parse_expr("a + 1", Pos::start()).unwrap();
/// assert_eq!(expr.span.end.column, 6);
/// assert!(parse_expr("a +", Pos::start()).is_err());
/// ```
pub fn parse_expr(source: &str, start: Pos) -> Result<Expr, CompileError> {
    if source.trim().is_empty() {
        return Err(CompileError::new(start, "empty expression"));
    }

    let locator = Locator { source, start };
    let mut pairs = GrammarParser::parse(Rule::expression, source).map_err(|e| {
        let offset = match e.location {
            pest::error::InputLocation::Pos(p) => p,
            pest::error::InputLocation::Span((s, _)) => s,
        };
        CompileError::new(
            locator.pos(offset),
            format!("invalid expression: {}", e.variant.message()),
        )
    })?;

    // expression = { SOI ~ expr ~ EOI }
    let expression = locator.next(&mut pairs, start)?;
    let mut inner = expression.into_inner();
    let expr = locator.next(&mut inner, start)?;
    locator.build_expr(expr)
}

/// Maps byte offsets within one expression source onto absolute positions.
struct Locator<'a> {
    source: &'a str,
    start: Pos,
}

impl Locator<'_> {
    fn pos(&self, offset: usize) -> Pos {
        let offset = offset.min(self.source.len());
        self.start.advance(&self.source[..offset])
    }

    fn span(&self, pair: &Pair<Rule>) -> Span {
        let s = pair.as_span();
        Span::new(self.pos(s.start()), self.pos(s.end()))
    }

    /// The next child the grammar guarantees to exist.
    fn next<'i>(&self, pairs: &mut Pairs<'i, Rule>, at: Pos) -> Result<Pair<'i, Rule>, CompileError> {
        pairs
            .next()
            .ok_or_else(|| CompileError::new(at, "invalid expression: truncated parse tree"))
    }

    // -- Expression building ---------------------------------------------

    fn build_expr(&self, pair: Pair<Rule>) -> Result<Expr, CompileError> {
        let span = self.span(&pair);
        let mut inner = pair.into_inner();

        let first = self.build_unary_expr(self.next(&mut inner, span.start)?)?;

        // Parse (bin_op ~ unary_expr)* pairs
        let mut rest: Vec<(BinOp, Expr)> = Vec::new();
        while let Some(op_pair) = inner.next() {
            let op_pos = self.span(&op_pair).start;
            let op = BinOp::from_symbol(op_pair.as_str()).ok_or_else(|| {
                CompileError::new(op_pos, format!("unknown operator `{}`", op_pair.as_str()))
            })?;
            let right = self.build_unary_expr(self.next(&mut inner, op_pos)?)?;
            rest.push((op, right));
        }

        Ok(climb(first, rest))
    }

    fn build_unary_expr(&self, pair: Pair<Rule>) -> Result<Expr, CompileError> {
        let span = self.span(&pair);
        let mut ops = Vec::new();
        let mut operand = None;

        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::unary_op => {
                    let op = if child.as_str() == "!" {
                        UnaryOp::Not
                    } else {
                        UnaryOp::Neg
                    };
                    ops.push((op, self.span(&child).start));
                }
                _ => operand = Some(self.build_postfix(child)?),
            }
        }

        let mut expr = operand
            .ok_or_else(|| CompileError::new(span.start, "expected operand"))?;

        // Innermost operator binds first: `-!x` is `-(!x)`.
        for (op, start) in ops.into_iter().rev() {
            let span = Span::new(start, expr.span.end);
            expr = Spanned::new(
                ExprKind::UnaryOp {
                    op,
                    operand: Box::new(expr),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn build_postfix(&self, pair: Pair<Rule>) -> Result<Expr, CompileError> {
        let span = self.span(&pair);
        let mut inner = pair.into_inner();
        let mut expr = self.build_atom(self.next(&mut inner, span.start)?)?;

        for member in inner {
            let member_span = self.span(&member);
            let name_pair = self.next(&mut member.into_inner(), member_span.start)?;
            expr = Spanned::new(
                ExprKind::Member {
                    target: Box::new(expr),
                    name: name_pair.as_str().to_string(),
                },
                span.merge(member_span),
            );
        }
        Ok(expr)
    }

    fn build_atom(&self, pair: Pair<Rule>) -> Result<Expr, CompileError> {
        let span = self.span(&pair);

        match pair.as_rule() {
            Rule::expr => self.build_expr(pair),
            Rule::identifier => Ok(Spanned::new(
                ExprKind::Variable(pair.as_str().to_string()),
                span,
            )),
            Rule::call => {
                let mut inner = pair.into_inner();
                let name = self.next(&mut inner, span.start)?.as_str().to_string();
                let mut args = Vec::new();
                if let Some(arg_list) = inner.next() {
                    for arg in arg_list.into_inner() {
                        args.push(self.build_expr(arg)?);
                    }
                }
                Ok(Spanned::new(ExprKind::Call { name, args }, span))
            }
            Rule::quoted_string => {
                let s = extract_string_content(pair);
                Ok(Spanned::new(ExprKind::Literal(Value::String(s)), span))
            }
            Rule::number => {
                let n: f64 = pair.as_str().parse().map_err(|_| {
                    CompileError::new(span.start, format!("invalid number: {}", pair.as_str()))
                })?;
                Ok(Spanned::new(ExprKind::Literal(Value::Number(n)), span))
            }
            Rule::bool_literal => {
                let b = pair.as_str() == "true";
                Ok(Spanned::new(ExprKind::Literal(Value::Bool(b)), span))
            }
            Rule::none_literal => Ok(Spanned::new(ExprKind::Literal(Value::None), span)),
            Rule::array_literal => {
                let mut elements = Vec::new();
                for inner_pair in pair.into_inner() {
                    elements.push(self.build_expr(inner_pair)?);
                }
                Ok(Spanned::new(ExprKind::ArrayLiteral(elements), span))
            }
            rule => Err(CompileError::new(
                span.start,
                format!("unexpected rule in atom position: {rule:?}"),
            )),
        }
    }
}

// -- Helpers -------------------------------------------------------------

/// Fold a flat `operand (op operand)*` list into a tree, honouring
/// [`BinOp::precedence`]. Operators of equal precedence associate left.
fn climb(first: Expr, rest: Vec<(BinOp, Expr)>) -> Expr {
    let mut operands: Vec<Expr> = vec![first];
    let mut operators: Vec<BinOp> = Vec::new();

    for (op, right) in rest {
        while let Some(&top) = operators.last()
            && top.precedence() >= op.precedence()
        {
            operators.pop();
            reduce(&mut operands, top);
        }
        operators.push(op);
        operands.push(right);
    }
    while let Some(op) = operators.pop() {
        reduce(&mut operands, op);
    }

    // Every reduce replaces two operands with one, so exactly one remains.
    operands.swap_remove(0)
}

fn reduce(operands: &mut Vec<Expr>, op: BinOp) {
    let (Some(right), Some(left)) = (operands.pop(), operands.pop()) else {
        return;
    };
    let span = left.span.merge(right.span);
    operands.push(Spanned::new(
        ExprKind::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    ));
}

fn extract_string_content(pair: Pair<Rule>) -> String {
    // quoted_string = ${ "\"" ~ dq_inner ~ "\"" | "'" ~ sq_inner ~ "'" }
    let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");

    // Process escape sequences
    let mut result = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some(other) => result.push(other),
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Expr {
        parse_expr(source, Pos::start()).expect("parse failed")
    }

    #[test]
    fn test_variable() {
        match parse("name").node {
            ExprKind::Variable(name) => assert_eq!(name, "name"),
            other => panic!("expected variable, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match parse("1 + 2 * 3").node {
            ExprKind::BinaryOp { op, right, .. } => {
                assert_eq!(op, BinOp::Add);
                assert!(matches!(
                    right.node,
                    ExprKind::BinaryOp { op: BinOp::Mul, .. }
                ));
            }
            other => panic!("expected binary op, got {other:?}"),
        }
    }

    #[test]
    fn test_left_associative() {
        // 8 - 4 - 2 parses as (8 - 4) - 2
        match parse("8 - 4 - 2").node {
            ExprKind::BinaryOp { op, left, right } => {
                assert_eq!(op, BinOp::Sub);
                assert!(matches!(left.node, ExprKind::BinaryOp { op: BinOp::Sub, .. }));
                assert!(matches!(right.node, ExprKind::Literal(Value::Number(n)) if n == 2.0));
            }
            other => panic!("expected binary op, got {other:?}"),
        }
    }

    #[test]
    fn test_member_and_call() {
        match parse("upper(user.name, 'x')").node {
            ExprKind::Call { name, args } => {
                assert_eq!(name, "upper");
                assert_eq!(args.len(), 2);
                assert!(matches!(&args[0].node, ExprKind::Member { name, .. } if name == "name"));
                assert!(matches!(&args[1].node, ExprKind::Literal(Value::String(s)) if s == "x"));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_keywords_are_not_identifiers() {
        assert!(matches!(parse("true").node, ExprKind::Literal(Value::Bool(true))));
        assert!(matches!(parse("none").node, ExprKind::Literal(Value::None)));
        assert!(matches!(parse("nonempty").node, ExprKind::Variable(_)));
    }

    #[test]
    fn test_string_escapes() {
        match parse(r#""a\"b\n""#).node {
            ExprKind::Literal(Value::String(s)) => assert_eq!(s, "a\"b\n"),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn test_spans_are_absolute() {
        let start = Pos::new(10, 2, 5);
        let expr = parse_expr("a + bb", start).unwrap();
        assert_eq!(expr.span.start, start);
        assert_eq!(expr.span.end, Pos::new(16, 2, 11));
        match expr.node {
            ExprKind::BinaryOp { right, .. } => assert_eq!(right.span.start, Pos::new(14, 2, 9)),
            other => panic!("expected binary op, got {other:?}"),
        }
    }

    #[test]
    fn test_errors_are_positioned() {
        let start = Pos::new(2, 1, 3);
        let err = parse_expr("a +", start).unwrap_err();
        assert_eq!(err.pos.line, 1);
        assert!(err.pos >= start);
        assert!(err.message.starts_with("invalid expression"));

        let err = parse_expr("  ", start).unwrap_err();
        assert_eq!(err.pos, start);
        assert_eq!(err.message, "empty expression");
    }
}
