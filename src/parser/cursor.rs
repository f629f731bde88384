//! Token cursor with explicit depth accounting.
//!
//! The cursor owns all parse-state that the grammar functions thread
//! through recursion: the current position and the expression nesting
//! depth. Exceeding the depth cap turns into a typed "query too large"
//! error instead of a stack overflow.

use crate::error::{ParseError, ParseResult};
use crate::lexer::{Token, TokenKind};

/// A forward-only cursor over a trivia-free token slice.
///
/// The slice must end with a single [`TokenKind::Eof`] token; the cursor
/// never advances past it.
pub struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor. `tokens` must be non-empty and Eof-terminated.
    #[must_use]
    pub fn new(tokens: &'a [Token], max_depth: usize) -> Self {
        debug_assert!(tokens.last().is_some_and(|t| t.kind == TokenKind::Eof));
        Self { tokens, pos: 0, depth: 0, max_depth }
    }

    /// The current token.
    #[must_use]
    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// The current token's kind.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    /// True when the cursor sits on the Eof token.
    #[must_use]
    pub fn at_eof(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    /// The token after the current one, if any remains before Eof.
    #[must_use]
    pub fn peek_second(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).filter(|t| t.kind != TokenKind::Eof)
    }

    /// Returns the current token and moves forward.
    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Consumes the current token if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.kind() == kind {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consumes a token of the given kind or fails with a syntax error.
    pub fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        self.eat(kind).ok_or_else(|| self.error(kind.describe()))
    }

    /// True when the current token is the given keyword (case-insensitive).
    #[must_use]
    pub fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword)
    }

    /// Consumes the given keyword if present.
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the given keyword or fails with a syntax error.
    pub fn expect_keyword(&mut self, keyword: &str) -> ParseResult<Token> {
        if self.at_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.error(&format!("'{keyword}'")))
        }
    }

    /// Builds a syntax error pointing at the current token.
    #[must_use]
    pub fn error(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::Syntax {
            expected: expected.to_string(),
            found: token.to_string(),
            line: token.span.line,
            column: token.span.column,
        }
    }

    /// Enters one level of expression nesting.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::TooLarge`] when the configured cap is exceeded.
    pub fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            let token = self.peek();
            return Err(ParseError::TooLarge {
                max_depth: self.max_depth,
                line: token.span.line,
                column: token.span.column,
            });
        }
        Ok(())
    }

    /// Leaves one level of expression nesting.
    pub fn exit(&mut self) {
        debug_assert!(self.depth > 0);
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().filter(|t| !t.kind.is_trivia()).collect()
    }

    #[test]
    fn advance_stops_at_eof() {
        let toks = tokens("a b");
        let mut cur = Cursor::new(&toks, 16);
        cur.advance();
        cur.advance();
        assert!(cur.at_eof());
        cur.advance();
        assert!(cur.at_eof());
    }

    #[test]
    fn expect_reports_found_token() {
        let toks = tokens("42");
        let mut cur = Cursor::new(&toks, 16);
        let err = cur.expect(TokenKind::Ident).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
        assert!(err.to_string().contains("identifier"));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn depth_cap_is_enforced() {
        let toks = tokens("x");
        let mut cur = Cursor::new(&toks, 2);
        assert!(cur.enter().is_ok());
        assert!(cur.enter().is_ok());
        assert!(matches!(cur.enter(), Err(ParseError::TooLarge { max_depth: 2, .. })));
    }
}
