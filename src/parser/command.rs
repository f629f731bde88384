//! Command-level parsing.
//!
//! A query is one source command followed by pipe-separated processing
//! commands. Dispatch is an ordered keyword match, so ambiguous inputs
//! always resolve the same way and failures are fail-fast with the
//! offending token's position. Dev-gated commands are checked against the
//! parser configuration at parse time, before their sub-grammar runs.

use crate::ast::{Command, Expr, NamedExpr, Query, QualifiedName, RenamePair, SortKey};
use crate::error::ParseResult;
use crate::lexer::{Span, TokenKind};

use super::cursor::Cursor;
use super::expr::parse_expr;
use super::ParserConfig;

/// Parses a complete query: source command plus pipeline.
pub fn parse_query(cur: &mut Cursor<'_>, config: &ParserConfig) -> ParseResult<Query> {
    let source = parse_source_command(cur)?;
    let mut pipeline = Vec::new();
    while cur.eat(TokenKind::Pipe).is_some() {
        pipeline.push(parse_processing_command(cur, config)?);
    }
    if !cur.at_eof() {
        return Err(cur.error("'|' or end of query"));
    }
    let span = pipeline
        .last()
        .map_or(source.span(), |last| source.span().to(last.span()));
    Ok(Query { source, pipeline, span })
}

fn parse_source_command(cur: &mut Cursor<'_>) -> ParseResult<Command> {
    if cur.at_keyword("from") {
        let start = cur.advance().span;
        return parse_from(cur, start);
    }
    if cur.at_keyword("row") {
        let start = cur.advance().span;
        let fields = parse_named_exprs(cur)?;
        let span = fields.last().map_or(start, |f| start.to(f.span));
        return Ok(Command::Row { fields, span });
    }
    if cur.at_keyword("show") {
        let start = cur.advance().span;
        let end = cur.expect_keyword("info")?.span;
        return Ok(Command::Show { span: start.to(end) });
    }
    Err(cur.error("a source command (FROM, ROW or SHOW)"))
}

fn parse_processing_command(cur: &mut Cursor<'_>, config: &ParserConfig) -> ParseResult<Command> {
    let keyword = cur.peek().clone();
    if keyword.kind != TokenKind::Ident {
        return Err(cur.error("a command name"));
    }

    // Dev-gated productions are a parse-time semantic predicate: the keyword
    // itself is rejected when dev features are off.
    let dev_only = keyword.is_keyword("join")
        || keyword.is_keyword("lookup")
        || keyword.is_keyword("inlinestats");
    if dev_only && !config.dev_features {
        return Err(cur.error("a processing command (this one requires dev features)"));
    }

    let start = cur.advance().span;
    match keyword.text.to_ascii_lowercase().as_str() {
        "where" => {
            let predicate = parse_expr(cur)?;
            let span = start.to(predicate.span);
            Ok(Command::Where { predicate, span })
        }
        "eval" => {
            let fields = parse_named_exprs(cur)?;
            let span = fields.last().map_or(start, |f| start.to(f.span));
            Ok(Command::Eval { fields, span })
        }
        "stats" => {
            let (aggregates, groupings, span) = parse_stats_body(cur, start)?;
            Ok(Command::Stats { aggregates, groupings, span })
        }
        "inlinestats" => {
            let (aggregates, groupings, span) = parse_stats_body(cur, start)?;
            Ok(Command::InlineStats { aggregates, groupings, span })
        }
        "sort" => {
            let keys = parse_sort_keys(cur)?;
            let span = keys.last().map_or(start, |k| start.to(k.span));
            Ok(Command::Sort { keys, span })
        }
        "limit" => {
            let token = cur.expect(TokenKind::Int)?;
            let count: i64 = token
                .text
                .parse()
                .map_err(|_| syntax_at(&token, "integer literal in range"))?;
            Ok(Command::Limit { count, span: start.to(token.span) })
        }
        "keep" => {
            let (fields, span) = parse_name_list(cur, start)?;
            Ok(Command::Keep { fields, span })
        }
        "drop" => {
            let (fields, span) = parse_name_list(cur, start)?;
            Ok(Command::Drop { fields, span })
        }
        "rename" => {
            let pairs = parse_rename_pairs(cur)?;
            let span = pairs.last().map_or(start, |p| start.to(p.span));
            Ok(Command::Rename { pairs, span })
        }
        "dissect" => {
            let (field, pattern, span) = parse_extract_body(cur, start)?;
            Ok(Command::Dissect { field, pattern, span })
        }
        "grok" => {
            let (field, pattern, span) = parse_extract_body(cur, start)?;
            Ok(Command::Grok { field, pattern, span })
        }
        "mv_expand" => {
            let (field, end) = parse_qualified_name(cur)?;
            Ok(Command::MvExpand { field, span: start.to(end) })
        }
        "enrich" => parse_enrich(cur, start),
        "join" => {
            let index = cur.expect(TokenKind::Ident)?;
            cur.expect_keyword("on")?;
            let (on, end) = parse_qualified_name(cur)?;
            Ok(Command::Join { index: index.text, on, span: start.to(end) })
        }
        "lookup" => {
            let index = cur.expect(TokenKind::Ident)?;
            cur.expect_keyword("on")?;
            let mut on = Vec::new();
            let mut end = index.span;
            loop {
                let (name, name_end) = parse_qualified_name(cur)?;
                end = name_end;
                on.push(name);
                if cur.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            Ok(Command::Lookup { index: index.text, on, span: start.to(end) })
        }
        _ => Err(syntax_at(&keyword, "a command name")),
    }
}

fn parse_from(cur: &mut Cursor<'_>, start: Span) -> ParseResult<Command> {
    let mut indices = Vec::new();
    let mut end = start;
    loop {
        let token = match cur.kind() {
            TokenKind::Ident | TokenKind::QuotedIdent | TokenKind::Str => cur.advance(),
            _ => return Err(cur.error("index name")),
        };
        end = token.span;
        let mut name = token.text;
        // Dotted index names, e.g. `metrics.cpu`.
        while cur.eat(TokenKind::Dot).is_some() {
            let segment = cur.expect(TokenKind::Ident)?;
            end = segment.span;
            name.push('.');
            name.push_str(&segment.text);
        }
        indices.push(name);
        if cur.eat(TokenKind::Comma).is_none() {
            break;
        }
    }
    Ok(Command::From { indices, span: start.to(end) })
}

/// Parses `[name =] expr[, …]` lists shared by `ROW`, `EVAL` and `STATS`.
fn parse_named_exprs(cur: &mut Cursor<'_>) -> ParseResult<Vec<NamedExpr>> {
    let mut entries = Vec::new();
    loop {
        entries.push(parse_named_expr(cur)?);
        if cur.eat(TokenKind::Comma).is_none() {
            return Ok(entries);
        }
    }
}

fn parse_named_expr(cur: &mut Cursor<'_>) -> ParseResult<NamedExpr> {
    let start = cur.peek().span;
    let name = if matches!(cur.kind(), TokenKind::Ident | TokenKind::QuotedIdent)
        && cur.peek_second().is_some_and(|t| t.kind == TokenKind::Assign)
    {
        let name = cur.advance().text;
        cur.advance();
        Some(name)
    } else {
        None
    };
    let expr = parse_expr(cur)?;
    let span = start.to(expr.span);
    Ok(NamedExpr { name, expr, span })
}

fn parse_stats_body(
    cur: &mut Cursor<'_>,
    start: Span,
) -> ParseResult<(Vec<NamedExpr>, Vec<Expr>, Span)> {
    let mut aggregates = Vec::new();
    let mut end = start;
    loop {
        let entry = parse_named_expr(cur)?;
        end = entry.span;
        aggregates.push(entry);
        if cur.eat(TokenKind::Comma).is_none() {
            break;
        }
    }
    let mut groupings = Vec::new();
    if cur.eat_keyword("by") {
        loop {
            let expr = parse_expr(cur)?;
            end = expr.span;
            groupings.push(expr);
            if cur.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
    }
    Ok((aggregates, groupings, start.to(end)))
}

fn parse_sort_keys(cur: &mut Cursor<'_>) -> ParseResult<Vec<SortKey>> {
    let mut keys = Vec::new();
    loop {
        let expr = parse_expr(cur)?;
        let mut span = expr.span;
        let mut ascending = true;
        if cur.at_keyword("asc") {
            span = span.to(cur.advance().span);
        } else if cur.at_keyword("desc") {
            span = span.to(cur.advance().span);
            ascending = false;
        }
        let mut nulls_first = None;
        if cur.at_keyword("nulls") {
            cur.advance();
            if cur.eat_keyword("first") {
                nulls_first = Some(true);
            } else if cur.eat_keyword("last") {
                nulls_first = Some(false);
            } else {
                return Err(cur.error("FIRST or LAST after NULLS"));
            }
        }
        keys.push(SortKey { expr, ascending, nulls_first, span });
        if cur.eat(TokenKind::Comma).is_none() {
            return Ok(keys);
        }
    }
}

fn parse_name_list(
    cur: &mut Cursor<'_>,
    start: Span,
) -> ParseResult<(Vec<QualifiedName>, Span)> {
    let mut names = Vec::new();
    let mut end = start;
    loop {
        let (name, name_end) = parse_qualified_name(cur)?;
        end = name_end;
        names.push(name);
        if cur.eat(TokenKind::Comma).is_none() {
            return Ok((names, start.to(end)));
        }
    }
}

fn parse_qualified_name(cur: &mut Cursor<'_>) -> ParseResult<(QualifiedName, Span)> {
    let head = match cur.kind() {
        TokenKind::Ident | TokenKind::QuotedIdent => cur.advance(),
        _ => return Err(cur.error("field name")),
    };
    let mut parts = vec![head.text];
    let mut end = head.span;
    while cur.eat(TokenKind::Dot).is_some() {
        let segment = match cur.kind() {
            TokenKind::Ident | TokenKind::QuotedIdent => cur.advance(),
            _ => return Err(cur.error("field name segment")),
        };
        end = segment.span;
        parts.push(segment.text);
    }
    Ok((QualifiedName::new(parts), end))
}

fn parse_rename_pairs(cur: &mut Cursor<'_>) -> ParseResult<Vec<RenamePair>> {
    let mut pairs = Vec::new();
    loop {
        let pair_start = cur.peek().span;
        let (old, _) = parse_qualified_name(cur)?;
        cur.expect_keyword("as")?;
        let new = match cur.kind() {
            TokenKind::Ident | TokenKind::QuotedIdent => cur.advance(),
            _ => return Err(cur.error("new field name")),
        };
        pairs.push(RenamePair { old, new: new.text, span: pair_start.to(new.span) });
        if cur.eat(TokenKind::Comma).is_none() {
            return Ok(pairs);
        }
    }
}

/// Parses `field "pattern"` shared by `DISSECT` and `GROK`.
fn parse_extract_body(cur: &mut Cursor<'_>, start: Span) -> ParseResult<(Expr, String, Span)> {
    let field = parse_expr(cur)?;
    let pattern = cur.expect(TokenKind::Str)?;
    let span = start.to(pattern.span);
    Ok((field, pattern.text, span))
}

fn parse_enrich(cur: &mut Cursor<'_>, start: Span) -> ParseResult<Command> {
    let policy = match cur.kind() {
        TokenKind::Ident | TokenKind::Str => cur.advance(),
        _ => return Err(cur.error("enrich policy name")),
    };
    let mut end = policy.span;
    // The textual order is fixed: ON before WITH. Enumerating the legal
    // ordering explicitly keeps the parse deterministic.
    let mut on = None;
    if cur.eat_keyword("on") {
        let (name, name_end) = parse_qualified_name(cur)?;
        end = name_end;
        on = Some(name);
    }
    let mut with = Vec::new();
    if cur.eat_keyword("with") {
        loop {
            let entry = parse_named_expr(cur)?;
            end = entry.span;
            with.push(entry);
            if cur.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
    }
    Ok(Command::Enrich { policy: policy.text, on, with, span: start.to(end) })
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

    fn parse(source: &str) -> Query {
        try_parse(source, &ParserConfig::default()).unwrap()
    }

    fn try_parse(source: &str, config: &ParserConfig) -> ParseResult<Query> {
        let tokens: Vec<_> =
            tokenize(source)?.into_iter().filter(|t| !t.kind.is_trivia()).collect();
        let mut cur = Cursor::new(&tokens, config.max_expression_depth);
        parse_query(&mut cur, config)
    }

    fn dev() -> ParserConfig {
        ParserConfig { dev_features: true, ..ParserConfig::default() }
    }

    #[test]
    fn from_with_pipeline() {
        let query = parse("from logs | where status == 200 | limit 10");
        assert!(matches!(query.source, Command::From { .. }));
        assert_eq!(query.pipeline.len(), 2);
        assert_eq!(query.pipeline[0].name(), "where");
        assert_eq!(query.pipeline[1].name(), "limit");
    }

    #[test]
    fn from_multiple_indices() {
        let query = parse("from logs, metrics.cpu");
        match query.source {
            Command::From { indices, .. } => {
                assert_eq!(indices, vec!["logs".to_string(), "metrics.cpu".to_string()]);
            }
            other => panic!("expected FROM, got {other:?}"),
        }
    }

    #[test]
    fn row_source() {
        let query = parse("row a = 1, b = \"x\"");
        match query.source {
            Command::Row { fields, .. } => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].name.as_deref(), Some("a"));
            }
            other => panic!("expected ROW, got {other:?}"),
        }
    }

    #[test]
    fn stats_with_by() {
        let query = parse("from logs | stats count(), max(bytes) by host, region");
        match &query.pipeline[0] {
            Command::Stats { aggregates, groupings, .. } => {
                assert_eq!(aggregates.len(), 2);
                assert_eq!(groupings.len(), 2);
            }
            other => panic!("expected STATS, got {other:?}"),
        }
    }

    #[test]
    fn stats_with_named_aggregate() {
        let query = parse("from logs | stats total = count() by host");
        match &query.pipeline[0] {
            Command::Stats { aggregates, .. } => {
                assert_eq!(aggregates[0].name.as_deref(), Some("total"));
            }
            other => panic!("expected STATS, got {other:?}"),
        }
    }

    #[test]
    fn sort_directions_and_nulls() {
        let query = parse("from logs | sort host asc, bytes desc nulls last");
        match &query.pipeline[0] {
            Command::Sort { keys, .. } => {
                assert!(keys[0].ascending);
                assert_eq!(keys[0].nulls_first, None);
                assert!(!keys[1].ascending);
                assert_eq!(keys[1].nulls_first, Some(false));
            }
            other => panic!("expected SORT, got {other:?}"),
        }
    }

    #[test]
    fn rename_pairs() {
        let query = parse("from logs | rename src.ip as source, dst.ip as dest");
        match &query.pipeline[0] {
            Command::Rename { pairs, .. } => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[0].old.dotted(), "src.ip");
                assert_eq!(pairs[0].new, "source");
            }
            other => panic!("expected RENAME, got {other:?}"),
        }
    }

    #[test]
    fn enrich_on_with_order_is_fixed() {
        let query = parse("from logs | enrich geo on client.ip with city = geo.city, country");
        match &query.pipeline[0] {
            Command::Enrich { policy, on, with, .. } => {
                assert_eq!(policy, "geo");
                assert_eq!(on.as_ref().unwrap().dotted(), "client.ip");
                assert_eq!(with.len(), 2);
            }
            other => panic!("expected ENRICH, got {other:?}"),
        }
        // WITH before ON is not a legal ordering.
        assert!(try_parse(
            "from logs | enrich geo with city = geo.city on client.ip",
            &ParserConfig::default()
        )
        .is_err());
    }

    #[test]
    fn dissect_and_grok() {
        let query = parse("from logs | dissect message \"%{client} %{code}\"");
        assert_eq!(query.pipeline[0].name(), "dissect");
        let query = parse("from logs | grok message \"%{IP:client}\"");
        assert_eq!(query.pipeline[0].name(), "grok");
    }

    #[test]
    fn join_requires_dev_features() {
        let err = try_parse("from logs | join hosts on host", &ParserConfig::default())
            .unwrap_err();
        match err {
            crate::error::ParseError::Syntax { found, line, column, .. } => {
                assert_eq!(found, "join");
                assert_eq!(line, 1);
                assert_eq!(column, 13);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
        assert!(try_parse("from logs | join hosts on host", &dev()).is_ok());
    }

    #[test]
    fn lookup_and_inlinestats_parse_in_dev_mode() {
        assert!(try_parse("from logs | lookup t on host", &dev()).is_ok());
        assert!(try_parse("from logs | inlinestats count() by host", &dev()).is_ok());
        assert!(try_parse("from logs | lookup t on host", &ParserConfig::default()).is_err());
    }

    #[test]
    fn unknown_command_is_rejected_with_position() {
        let err = try_parse("from logs | frobnicate x", &ParserConfig::default()).unwrap_err();
        match err {
            crate::error::ParseError::Syntax { found, column, .. } => {
                assert_eq!(found, "frobnicate");
                assert_eq!(column, 13);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn show_requires_info() {
        assert!(try_parse("show info", &ParserConfig::default()).is_ok());
        assert!(try_parse("show", &ParserConfig::default()).is_err());
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(try_parse("from logs extra", &ParserConfig::default()).is_err());
    }
}
