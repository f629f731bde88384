//! Expression parsing.
//!
//! Precedence climbing with left-associative loops at every binary level,
//! so no grammar rule is left-recursive and deep operand chains cost no
//! stack. Recursion only happens through parentheses, unary operators and
//! call arguments, all behind the cursor's depth guard.
//!
//! Precedence, weakest to tightest:
//!
//! 1. `OR`
//! 2. `AND`
//! 3. `NOT`
//! 4. comparison (`== != < <= > >=`, `IS NULL`, `IN`, `LIKE`, `RLIKE`)
//! 5. `+ -`
//! 6. `* / %`
//! 7. unary `+ -`
//! 8. postfix `::type` cast and `[index]`

use crate::ast::{BinaryOp, Expr, ExprKind, Literal, QualifiedName, UnaryOp};
use crate::error::ParseResult;
use crate::lexer::{Span, TokenKind};

use super::cursor::Cursor;

/// Parses a full expression.
pub fn parse_expr(cur: &mut Cursor<'_>) -> ParseResult<Expr> {
    cur.enter()?;
    let result = parse_or(cur);
    cur.exit();
    result
}

fn parse_or(cur: &mut Cursor<'_>) -> ParseResult<Expr> {
    let mut left = parse_and(cur)?;
    while cur.eat_keyword("or") {
        let right = parse_and(cur)?;
        left = Expr::binary(BinaryOp::Or, left, right);
    }
    Ok(left)
}

fn parse_and(cur: &mut Cursor<'_>) -> ParseResult<Expr> {
    let mut left = parse_not(cur)?;
    while cur.eat_keyword("and") {
        let right = parse_not(cur)?;
        left = Expr::binary(BinaryOp::And, left, right);
    }
    Ok(left)
}

fn parse_not(cur: &mut Cursor<'_>) -> ParseResult<Expr> {
    if cur.at_keyword("not") {
        let op_span = cur.advance().span;
        cur.enter()?;
        let operand = parse_not(cur)?;
        cur.exit();
        return Ok(Expr::unary(UnaryOp::Not, operand, op_span));
    }
    parse_comparison(cur)
}

fn parse_comparison(cur: &mut Cursor<'_>) -> ParseResult<Expr> {
    let mut left = parse_additive(cur)?;
    loop {
        let op = match cur.kind() {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::NotEq),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::LtEq => Some(BinaryOp::LtEq),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::GtEq => Some(BinaryOp::GtEq),
            _ => None,
        };
        if let Some(op) = op {
            cur.advance();
            let right = parse_additive(cur)?;
            left = Expr::binary(op, left, right);
            continue;
        }

        if cur.at_keyword("is") {
            cur.advance();
            let negated = cur.eat_keyword("not");
            let end = cur.expect_keyword("null")?.span;
            let span = left.span.to(end);
            left = Expr::new(ExprKind::IsNull { expr: Box::new(left), negated }, span);
            continue;
        }

        // Postfix negation: `a NOT IN (…)`, `a NOT LIKE "…"`.
        let negated = cur.at_keyword("not") && peek_is_membership_keyword(cur);
        if negated {
            cur.advance();
        }

        if cur.at_keyword("in") || cur.at_keyword("in~") {
            let case_insensitive = cur.peek().text.ends_with('~');
            cur.advance();
            cur.expect(TokenKind::LParen)?;
            let mut list = Vec::new();
            if cur.kind() != TokenKind::RParen {
                loop {
                    list.push(parse_expr(cur)?);
                    if cur.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }
            let end = cur.expect(TokenKind::RParen)?.span;
            let span = left.span.to(end);
            left = Expr::new(
                ExprKind::In { expr: Box::new(left), list, negated, case_insensitive },
                span,
            );
            continue;
        }

        let like = cur.at_keyword("like") || cur.at_keyword("like~");
        let rlike = cur.at_keyword("rlike") || cur.at_keyword("rlike~");
        if like || rlike {
            let case_insensitive = cur.peek().text.ends_with('~');
            cur.advance();
            let pattern = parse_additive(cur)?;
            let span = left.span.to(pattern.span);
            left = Expr::new(
                ExprKind::Like {
                    expr: Box::new(left),
                    pattern: Box::new(pattern),
                    negated,
                    case_insensitive,
                    regex: rlike,
                },
                span,
            );
            continue;
        }

        if negated {
            return Err(cur.error("IN, LIKE or RLIKE after NOT"));
        }
        return Ok(left);
    }
}

/// Looks one token past a leading `not` for `IN`/`LIKE`/`RLIKE`.
fn peek_is_membership_keyword(cur: &Cursor<'_>) -> bool {
    // The cursor has no second-token lookahead; keyword postfix forms are
    // the one place the grammar needs it, so it lives here.
    cur.peek_second().is_some_and(|t| {
        t.kind == TokenKind::Ident
            && ["in", "in~", "like", "like~", "rlike", "rlike~"]
                .iter()
                .any(|k| t.text.eq_ignore_ascii_case(k))
    })
}

fn parse_additive(cur: &mut Cursor<'_>) -> ParseResult<Expr> {
    let mut left = parse_multiplicative(cur)?;
    loop {
        let op = match cur.kind() {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            _ => return Ok(left),
        };
        cur.advance();
        let right = parse_multiplicative(cur)?;
        left = Expr::binary(op, left, right);
    }
}

fn parse_multiplicative(cur: &mut Cursor<'_>) -> ParseResult<Expr> {
    let mut left = parse_unary(cur)?;
    loop {
        let op = match cur.kind() {
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            _ => return Ok(left),
        };
        cur.advance();
        let right = parse_unary(cur)?;
        left = Expr::binary(op, left, right);
    }
}

fn parse_unary(cur: &mut Cursor<'_>) -> ParseResult<Expr> {
    let op = match cur.kind() {
        TokenKind::Plus => Some(UnaryOp::Plus),
        TokenKind::Minus => Some(UnaryOp::Minus),
        _ => None,
    };
    if let Some(op) = op {
        let op_span = cur.advance().span;
        cur.enter()?;
        let operand = parse_unary(cur)?;
        cur.exit();
        return Ok(Expr::unary(op, operand, op_span));
    }
    parse_postfix(cur)
}

fn parse_postfix(cur: &mut Cursor<'_>) -> ParseResult<Expr> {
    let mut expr = parse_primary(cur)?;
    loop {
        if cur.eat(TokenKind::DoubleColon).is_some() {
            let ty = cur.expect(TokenKind::Ident)?;
            let span = expr.span.to(ty.span);
            expr = Expr::new(
                ExprKind::Cast { expr: Box::new(expr), ty: ty.text.to_ascii_lowercase() },
                span,
            );
            continue;
        }
        if cur.eat(TokenKind::LBracket).is_some() {
            let index = parse_expr(cur)?;
            let end = cur.expect(TokenKind::RBracket)?.span;
            let span = expr.span.to(end);
            expr = Expr::new(
                ExprKind::Index { expr: Box::new(expr), index: Box::new(index) },
                span,
            );
            continue;
        }
        return Ok(expr);
    }
}

fn parse_primary(cur: &mut Cursor<'_>) -> ParseResult<Expr> {
    match cur.kind() {
        TokenKind::Int => {
            let token = cur.advance();
            let value: i64 = token
                .text
                .parse()
                .map_err(|_| syntax_at(&token, "integer literal in range"))?;
            Ok(Expr::literal(Literal::Integer(value), token.span))
        }
        TokenKind::Decimal => {
            let token = cur.advance();
            let value: f64 =
                token.text.parse().map_err(|_| syntax_at(&token, "decimal literal"))?;
            Ok(Expr::literal(Literal::Decimal(value), token.span))
        }
        TokenKind::Str => {
            let token = cur.advance();
            Ok(Expr::literal(Literal::String(token.text), token.span))
        }
        TokenKind::LParen => {
            let start = cur.advance().span;
            let inner = parse_expr(cur)?;
            let end = cur.expect(TokenKind::RParen)?.span;
            Ok(Expr::new(inner.kind, start.to(end)))
        }
        TokenKind::LBracket => {
            let start = cur.advance().span;
            let mut items = Vec::new();
            if cur.kind() != TokenKind::RBracket {
                loop {
                    items.push(parse_expr(cur)?);
                    if cur.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }
            let end = cur.expect(TokenKind::RBracket)?.span;
            Ok(Expr::new(ExprKind::List(items), start.to(end)))
        }
        TokenKind::Ident => {
            if cur.at_keyword("true") {
                let span = cur.advance().span;
                return Ok(Expr::literal(Literal::Boolean(true), span));
            }
            if cur.at_keyword("false") {
                let span = cur.advance().span;
                return Ok(Expr::literal(Literal::Boolean(false), span));
            }
            if cur.at_keyword("null") {
                let span = cur.advance().span;
                return Ok(Expr::literal(Literal::Null, span));
            }
            let head = cur.advance();
            if cur.kind() == TokenKind::LParen {
                return parse_call(cur, &head.text, head.span);
            }
            parse_qualified_tail(cur, head.text, head.span)
        }
        TokenKind::QuotedIdent => {
            let head = cur.advance();
            parse_qualified_tail(cur, head.text, head.span)
        }
        _ => Err(cur.error("expression")),
    }
}

/// Parses the argument list of a call whose name was just consumed.
fn parse_call(cur: &mut Cursor<'_>, name: &str, name_span: Span) -> ParseResult<Expr> {
    cur.expect(TokenKind::LParen)?;
    let mut args = Vec::new();
    if cur.kind() != TokenKind::RParen {
        loop {
            args.push(parse_expr(cur)?);
            if cur.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
    }
    let end = cur.expect(TokenKind::RParen)?.span;
    Ok(Expr::new(
        ExprKind::Call { name: name.to_string(), args },
        name_span.to(end),
    ))
}

/// Parses the `.segment` tail of a field reference.
fn parse_qualified_tail(cur: &mut Cursor<'_>, head: String, head_span: Span) -> ParseResult<Expr> {
    let mut parts = vec![head];
    let mut span = head_span;
    while cur.eat(TokenKind::Dot).is_some() {
        let segment = match cur.kind() {
            TokenKind::Ident | TokenKind::QuotedIdent => cur.advance(),
            _ => return Err(cur.error("field name segment")),
        };
        span = span.to(segment.span);
        parts.push(segment.text);
    }
    Ok(Expr::field(QualifiedName::new(parts), span))
}

fn syntax_at(token: &crate::lexer::Token, expected: &str) -> crate::error::ParseError {
    crate::error::ParseError::Syntax {
        expected: expected.to_string(),
        found: token.to_string(),
        line: token.span.line,
        column: token.span.column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> Expr {
        try_parse(source).unwrap()
    }

    fn try_parse(source: &str) -> ParseResult<Expr> {
        let tokens: Vec<_> =
            tokenize(source)?.into_iter().filter(|t| !t.kind.is_trivia()).collect();
        let mut cur = Cursor::new(&tokens, 64);
        let expr = parse_expr(&mut cur)?;
        if !cur.at_eof() {
            return Err(cur.error("end of expression"));
        }
        Ok(expr)
    }

    #[test]
    fn or_binds_weaker_than_and() {
        assert_eq!(parse("a or b and c").to_string(), "(a or (b and c))");
        assert_eq!(parse("a and b or c").to_string(), "((a and b) or c)");
    }

    #[test]
    fn not_binds_tighter_than_and() {
        assert_eq!(parse("not a and b").to_string(), "((not a) and b)");
    }

    #[test]
    fn not_binds_weaker_than_comparison() {
        assert_eq!(parse("not a == b").to_string(), "(not (a == b))");
    }

    #[test]
    fn comparison_binds_weaker_than_arithmetic() {
        assert_eq!(parse("a + b * c == d").to_string(), "((a + (b * c)) == d)");
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(parse("1 + 2 * 3 - 4 / 2").to_string(), "((1 + (2 * 3)) - (4 / 2))");
        assert_eq!(parse("10 % 3 + 1").to_string(), "((10 % 3) + 1)");
    }

    #[test]
    fn binary_levels_are_left_associative() {
        assert_eq!(parse("a - b - c").to_string(), "((a - b) - c)");
        assert_eq!(parse("a / b / c").to_string(), "((a / b) / c)");
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiplication() {
        assert_eq!(parse("-a * b").to_string(), "((- a) * b)");
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(parse("(a or b) and c").to_string(), "((a or b) and c)");
    }

    #[test]
    fn cast_is_postfix_and_tight() {
        assert_eq!(parse("a::integer + 1").to_string(), "(a::integer + 1)");
        assert_eq!(parse("a::integer::string").to_string(), "a::integer::string");
    }

    #[test]
    fn is_null_and_is_not_null() {
        assert_eq!(parse("a is null").to_string(), "a is null");
        assert_eq!(parse("a is not null").to_string(), "a is not null");
    }

    #[test]
    fn in_list() {
        assert_eq!(parse("x in (1, 2, 3)").to_string(), "x in (1, 2, 3)");
        assert_eq!(parse("x not in (1)").to_string(), "x not in (1)");
    }

    #[test]
    fn case_insensitive_variants() {
        let expr = parse("name like~ \"a%\"");
        assert!(matches!(
            expr.kind,
            ExprKind::Like { case_insensitive: true, regex: false, .. }
        ));
        let expr = parse("x in~ (\"a\")");
        assert!(matches!(expr.kind, ExprKind::In { case_insensitive: true, .. }));
    }

    #[test]
    fn rlike_is_regex() {
        let expr = parse("name rlike \"a.*\"");
        assert!(matches!(expr.kind, ExprKind::Like { regex: true, .. }));
    }

    #[test]
    fn qualified_field_name() {
        let expr = parse("host.name.keyword");
        match expr.kind {
            ExprKind::Field(name) => assert_eq!(name.dotted(), "host.name.keyword"),
            other => panic!("expected field, got {other:?}"),
        }
    }

    #[test]
    fn call_with_arguments() {
        assert_eq!(parse("substring(name, 1, 3)").to_string(), "substring(name, 1, 3)");
        assert_eq!(parse("count()").to_string(), "count()");
    }

    #[test]
    fn array_index_parses() {
        // Grammatically valid; the plan builder rejects it later.
        let expr = parse("events[0]");
        assert!(matches!(expr.kind, ExprKind::Index { .. }));
    }

    #[test]
    fn deep_nesting_hits_depth_cap() {
        let source = format!("{}x{}", "(".repeat(200), ")".repeat(200));
        let err = try_parse(&source).unwrap_err();
        assert!(matches!(err, crate::error::ParseError::TooLarge { .. }));
        assert!(err.to_string().contains("query too large"));
    }

    #[test]
    fn dangling_not_is_an_error() {
        assert!(try_parse("a not 5").is_err());
    }

    #[test]
    fn integer_overflow_is_reported() {
        let err = try_parse("99999999999999999999").unwrap_err();
        assert!(matches!(err, crate::error::ParseError::Syntax { .. }));
    }
}
