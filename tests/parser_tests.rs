//! End-to-end parser tests through the public API.

use pipeql::ast::{Command, ExprKind};
use pipeql::error::ParseError;
use pipeql::parser::{parse_expression, parse_query, ParserConfig};

fn parse(source: &str) -> pipeql::ast::Query {
    parse_query(source, &ParserConfig::default()).unwrap()
}

fn parse_err(source: &str) -> ParseError {
    parse_query(source, &ParserConfig::default()).unwrap_err()
}

#[test]
fn full_pipeline_command_sequence() {
    let query = parse(
        "from logs, metrics.prod \
         | where status == 200 and bytes > 1024 \
         | eval kb = bytes / 1024 \
         | stats total = count(), max_kb = max(kb) by host \
         | sort total desc nulls last, host \
         | keep host, total, max_kb \
         | limit 100",
    );
    assert_eq!(query.source.name(), "from");
    let names: Vec<_> = query.pipeline.iter().map(Command::name).collect();
    assert_eq!(names, vec!["where", "eval", "stats", "sort", "keep", "limit"]);
}

#[test]
fn from_collects_index_names() {
    // Names that are not bare identifiers can be quoted.
    let query = parse("from logs, metrics.prod, \"archive-2024\"");
    let Command::From { indices, .. } = &query.source else { panic!("expected FROM") };
    assert_eq!(indices, &["logs", "metrics.prod", "archive-2024"]);
}

#[test]
fn keywords_are_case_insensitive() {
    let upper = parse("FROM logs | WHERE status == 200 | LIMIT 5");
    let lower = parse("from logs | where status == 200 | limit 5");
    assert_eq!(upper, lower);
}

#[test]
fn comments_and_whitespace_are_ignored() {
    let query = parse(
        "from logs // trailing comment with | where inside\n\
         | where /* block\n comment */ status == 200",
    );
    assert_eq!(query.pipeline.len(), 1);
}

#[test]
fn row_with_explicit_and_implicit_names() {
    let query = parse("row a = 1, 2 + 3");
    let Command::Row { fields, .. } = &query.source else { panic!("expected ROW") };
    assert_eq!(fields[0].output_name(), "a");
    assert_eq!(fields[1].output_name(), "(2 + 3)");
}

#[test]
fn uppercase_not_in_is_postfix_negation() {
    let query = parse("from logs | where status NOT IN (404, 500)");
    let Command::Where { predicate, .. } = &query.pipeline[0] else { panic!("expected WHERE") };
    assert!(matches!(predicate.kind, ExprKind::In { negated: true, .. }));
}

#[test]
fn rename_pairs_parse_in_order() {
    let query = parse("from logs | rename a as b, c as d");
    let Command::Rename { pairs, .. } = &query.pipeline[0] else { panic!("expected RENAME") };
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].old.dotted(), "a");
    assert_eq!(pairs[0].new, "b");
}

#[test]
fn enrich_requires_on_before_with() {
    assert!(parse_query(
        "from logs | enrich geo on ip with city, country",
        &ParserConfig::default()
    )
    .is_ok());
    let err = parse_err("from logs | enrich geo with city on ip");
    assert!(matches!(err, ParseError::Syntax { .. }));
}

#[test]
fn dissect_and_grok_take_string_patterns() {
    let query = parse("from logs | dissect message \"%{client} %{status}\" | grok message \"%{IP:ip}\"");
    assert!(matches!(query.pipeline[0], Command::Dissect { .. }));
    assert!(matches!(query.pipeline[1], Command::Grok { .. }));
}

#[test]
fn dev_commands_are_gated_at_parse_time() {
    let err = parse_err("from logs | join hosts on id");
    let ParseError::Syntax { line, column, .. } = err else { panic!("expected syntax error") };
    assert_eq!((line, column), (1, 13));

    let dev = ParserConfig { dev_features: true, ..ParserConfig::default() };
    assert!(parse_query("from logs | join hosts on id", &dev).is_ok());
    assert!(parse_query("from logs | lookup t on id", &dev).is_ok());
    assert!(parse_query("from logs | inlinestats count() by host", &dev).is_ok());
}

#[test]
fn syntax_errors_carry_exact_positions() {
    let err = parse_err("from logs\n| where ==");
    let ParseError::Syntax { ref found, line, column, .. } = err else {
        panic!("expected syntax error, got {err:?}");
    };
    assert_eq!(found, "==");
    assert_eq!((line, column), (2, 9));
}

#[test]
fn lexical_errors_surface_through_parse() {
    let err = parse_err("from logs | where name == \"unterminated");
    assert!(matches!(err, ParseError::Lexical { .. }));
    assert!(err.to_string().contains("unterminated string"));
}

#[test]
fn empty_and_comment_only_input() {
    assert!(matches!(parse_err(""), ParseError::EmptyQuery));
    assert!(matches!(parse_err("  /* nothing */ "), ParseError::EmptyQuery));
}

#[test]
fn depth_cap_reports_query_too_large() {
    let source = format!("from logs | where {}x{}", "(".repeat(300), ")".repeat(300));
    let err = parse_err(&source);
    assert!(matches!(err, ParseError::TooLarge { max_depth: 128, .. }));
}

#[test]
fn depth_cap_is_configurable() {
    let config = ParserConfig { max_expression_depth: 4, ..ParserConfig::default() };
    assert!(parse_query("from logs | where ((x))", &config).is_ok());
    assert!(matches!(
        parse_query("from logs | where ((((((x))))))", &config),
        Err(ParseError::TooLarge { max_depth: 4, .. })
    ));
}

#[test]
fn backtick_identifiers_reach_the_ast() {
    let expr = parse_expression("`odd field` + 1", &ParserConfig::default()).unwrap();
    assert_eq!(expr.to_string(), "(odd field + 1)");
}

#[test]
fn triple_quoted_patterns_keep_backslashes() {
    let query = parse("from logs | grok path \"\"\"%{PATH:\\w+}\"\"\"");
    let Command::Grok { pattern, .. } = &query.pipeline[0] else { panic!("expected GROK") };
    assert_eq!(pattern, r"%{PATH:\w+}");
}

#[test]
fn pipeline_requires_command_after_pipe() {
    let err = parse_err("from logs |");
    assert!(matches!(err, ParseError::Syntax { .. }));
    assert!(err.to_string().contains("end of query"));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parse_never_panics(input in ".{0,120}") {
            let _ = parse_query(&input, &ParserConfig::default());
        }

        #[test]
        fn parsing_is_deterministic(limit in 0i64..10_000) {
            let source = format!("from logs | where a > {limit} | limit {limit}");
            let first = parse_query(&source, &ParserConfig::default()).unwrap();
            let second = parse_query(&source, &ParserConfig::default()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
