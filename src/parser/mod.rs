//! Parser for the pipe query language.
//!
//! Entry points take source text plus a [`ParserConfig`] and produce AST
//! values or a positioned [`crate::error::ParseError`]. Parsing is single-shot
//! and fail-fast: no error recovery, no partial results.

mod command;
mod cursor;
mod expr;

use crate::ast::{Expr, Query};
use crate::error::{ParseError, ParseResult};
use crate::lexer::{tokenize, Token, TokenKind};

use cursor::Cursor;

/// Capability flags and limits evaluated during parsing.
#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    /// Whether dev-gated commands (`JOIN`, `LOOKUP`, `INLINESTATS`) are
    /// accepted by the grammar.
    pub dev_features: bool,
    /// Maximum expression nesting depth before parsing fails with a
    /// "query too large" error.
    pub max_expression_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { dev_features: false, max_expression_depth: 128 }
    }
}

/// Parses a full query.
///
/// # Errors
///
/// Returns the first lexical or syntax error encountered; see
/// [`ParseError`] for the taxonomy.
///
/// # Examples
///
/// ```
/// use pipeql::parser::{parse_query, ParserConfig};
///
/// let query = parse_query("from logs | where status == 200", &ParserConfig::default()).unwrap();
/// assert_eq!(query.pipeline.len(), 1);
/// ```
pub fn parse_query(source: &str, config: &ParserConfig) -> ParseResult<Query> {
    let tokens = significant_tokens(source)?;
    let mut cur = Cursor::new(&tokens, config.max_expression_depth);
    command::parse_query(&mut cur, config)
}

/// Parses a standalone expression, for callers that evaluate expressions
/// outside a query pipeline.
///
/// # Errors
///
/// Returns the first lexical or syntax error encountered, or a syntax
/// error if trailing input remains after the expression.
pub fn parse_expression(source: &str, config: &ParserConfig) -> ParseResult<Expr> {
    let tokens = significant_tokens(source)?;
    let mut cur = Cursor::new(&tokens, config.max_expression_depth);
    let parsed = expr::parse_expr(&mut cur)?;
    if !cur.at_eof() {
        return Err(cur.error("end of expression"));
    }
    Ok(parsed)
}

/// Tokenizes and drops hidden-channel tokens.
fn significant_tokens(source: &str) -> ParseResult<Vec<Token>> {
    let tokens: Vec<_> =
        tokenize(source)?.into_iter().filter(|t| !t.kind.is_trivia()).collect();
    if tokens.len() == 1 && tokens[0].kind == TokenKind::Eof {
        return Err(ParseError::EmptyQuery);
    }
    Ok(tokens)
}
