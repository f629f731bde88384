//! The scanner: raw text to tokens.
//!
//! A single forward pass with limited lookahead. Whitespace and comments are
//! emitted as hidden-channel tokens and filtered out before parsing, so the
//! full token stream still covers every source byte.

use crate::error::{ParseError, ParseResult};

use super::token::{Span, Token, TokenKind};

/// Tokenizes a full source string.
///
/// The returned stream includes hidden-channel tokens ([`TokenKind::is_trivia`])
/// and always ends with a single [`TokenKind::Eof`] token.
///
/// # Errors
///
/// Returns [`ParseError::Lexical`] for unterminated strings or quoted
/// identifiers and for invalid escape sequences. An unterminated block
/// comment is not an error: it consumes the rest of the input.
pub fn tokenize(source: &str) -> ParseResult<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

/// Single-pass scanner over the source text.
struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, chars: src.char_indices().collect(), pos: 0, line: 1, column: 1 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, lookahead: usize) -> Option<char> {
        self.chars.get(self.pos + lookahead).map(|&(_, c)| c)
    }

    /// Byte offset of the current position.
    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.src.len(), |&(i, _)| i)
    }

    fn advance(&mut self) -> Option<char> {
        let &(_, c) = self.chars.get(self.pos)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consumes the next char if it equals `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_at(&self, message: impl Into<String>, line: u32, column: u32) -> ParseError {
        ParseError::Lexical { message: message.into(), line, column }
    }

    fn next_token(&mut self) -> ParseResult<Token> {
        let start = self.offset();
        let (line, column) = (self.line, self.column);
        let span_to_here = |lexer: &Self| Span::new(start, lexer.offset(), line, column);

        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", Span::new(start, start, line, column)));
        };

        if c.is_whitespace() {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }
            let span = span_to_here(self);
            return Ok(Token::new(TokenKind::Whitespace, &self.src[start..span.end], span));
        }

        if c == '/' && self.peek_at(1) == Some('/') {
            while self.peek().is_some_and(|c| c != '\n') {
                self.advance();
            }
            let span = span_to_here(self);
            return Ok(Token::new(TokenKind::LineComment, &self.src[start..span.end], span));
        }

        if c == '/' && self.peek_at(1) == Some('*') {
            self.advance();
            self.advance();
            // Non-nesting; an unterminated block comment consumes to EOF.
            loop {
                match self.advance() {
                    None => break,
                    Some('*') if self.eat('/') => break,
                    Some(_) => {}
                }
            }
            let span = span_to_here(self);
            return Ok(Token::new(TokenKind::BlockComment, &self.src[start..span.end], span));
        }

        if c == '"' || c == '\'' {
            return self.scan_string(c, start, line, column);
        }

        if c == '`' {
            return self.scan_backtick_ident(start, line, column);
        }

        if c.is_ascii_digit() {
            return Ok(self.scan_number(start, line, column));
        }

        if c.is_alphabetic() || c == '_' || c == '@' {
            while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
                self.advance();
            }
            // Case-insensitive operator variants: `in~`, `like~`, `rlike~`.
            self.eat('~');
            let span = span_to_here(self);
            return Ok(Token::new(TokenKind::Ident, &self.src[start..span.end], span));
        }

        self.advance();
        let kind = match c {
            '|' => TokenKind::Pipe,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => {
                if self.eat('=') {
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    return Err(self.error_at("unexpected character '!'", line, column));
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            ':' => {
                if self.eat(':') {
                    TokenKind::DoubleColon
                } else {
                    return Err(self.error_at("unexpected character ':'", line, column));
                }
            }
            other => {
                return Err(self.error_at(format!("unexpected character '{other}'"), line, column));
            }
        };
        let span = span_to_here(self);
        Ok(Token::new(kind, &self.src[start..span.end], span))
    }

    /// Scans a string literal starting at `quote`.
    ///
    /// Double quotes support the triple-quoted raw form `"""..."""` in which
    /// no escape processing happens.
    fn scan_string(&mut self, quote: char, start: usize, line: u32, column: u32) -> ParseResult<Token> {
        self.advance();

        if quote == '"' && self.peek() == Some('"') && self.peek_at(1) == Some('"') {
            self.advance();
            self.advance();
            let content_start = self.offset();
            loop {
                if self.peek().is_none() {
                    return Err(self.error_at("unterminated string", line, column));
                }
                if self.peek() == Some('"')
                    && self.peek_at(1) == Some('"')
                    && self.peek_at(2) == Some('"')
                {
                    let content_end = self.offset();
                    self.advance();
                    self.advance();
                    self.advance();
                    let span = Span::new(start, self.offset(), line, column);
                    return Ok(Token::new(TokenKind::Str, &self.src[content_start..content_end], span));
                }
                self.advance();
            }
        }

        let mut text = String::new();
        loop {
            let (esc_line, esc_column) = (self.line, self.column);
            match self.advance() {
                None => return Err(self.error_at("unterminated string", line, column)),
                Some('\n') => return Err(self.error_at("unterminated string", line, column)),
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    Some('n') => text.push('\n'),
                    Some('r') => text.push('\r'),
                    Some('t') => text.push('\t'),
                    Some('\\') => text.push('\\'),
                    Some('"') => text.push('"'),
                    Some('\'') => text.push('\''),
                    Some('u') => {
                        text.push(self.scan_unicode_escape(esc_line, esc_column)?);
                    }
                    Some(other) => {
                        return Err(self.error_at(
                            format!("invalid escape sequence '\\{other}'"),
                            esc_line,
                            esc_column,
                        ));
                    }
                    None => return Err(self.error_at("unterminated string", line, column)),
                },
                Some(c) => text.push(c),
            }
        }
        let span = Span::new(start, self.offset(), line, column);
        Ok(Token::new(TokenKind::Str, text, span))
    }

    /// Scans the `{HEX+}` tail of a `\u` escape.
    fn scan_unicode_escape(&mut self, line: u32, column: u32) -> ParseResult<char> {
        if !self.eat('{') {
            return Err(self.error_at("invalid unicode escape: expected '{'", line, column));
        }
        let mut value: u32 = 0;
        let mut digits = 0;
        loop {
            match self.advance() {
                Some('}') if digits > 0 => break,
                Some(c) if c.is_ascii_hexdigit() && digits < 6 => {
                    value = value * 16 + c.to_digit(16).unwrap_or(0);
                    digits += 1;
                }
                _ => {
                    return Err(self.error_at("invalid unicode escape", line, column));
                }
            }
        }
        char::from_u32(value)
            .ok_or_else(|| self.error_at("invalid unicode escape: not a character", line, column))
    }

    /// Scans a backtick-quoted identifier. A doubled backtick escapes a
    /// literal backtick.
    fn scan_backtick_ident(&mut self, start: usize, line: u32, column: u32) -> ParseResult<Token> {
        self.advance();
        let mut text = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(self.error_at("unterminated backtick identifier", line, column));
                }
                Some('`') => {
                    if self.eat('`') {
                        text.push('`');
                    } else {
                        break;
                    }
                }
                Some(c) => text.push(c),
            }
        }
        let span = Span::new(start, self.offset(), line, column);
        Ok(Token::new(TokenKind::QuotedIdent, text, span))
    }

    /// Scans an integer or decimal literal. The presence of a fractional
    /// part or an exponent makes it a decimal.
    fn scan_number(&mut self, start: usize, line: u32, column: u32) -> Token {
        let mut kind = TokenKind::Int;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::Decimal;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some('+' | '-')) {
                lookahead = 2;
            }
            if self.peek_at(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                kind = TokenKind::Decimal;
                for _ in 0..=lookahead {
                    self.advance();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        let span = Span::new(start, self.offset(), line, column);
        Token::new(kind, &self.src[start..span.end], span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.kind)
            .collect()
    }

    fn single(source: &str) -> Token {
        let tokens: Vec<_> = tokenize(source)
            .unwrap()
            .into_iter()
            .filter(|t| !t.kind.is_trivia() && t.kind != TokenKind::Eof)
            .collect();
        assert_eq!(tokens.len(), 1, "expected one token in {source:?}, got {tokens:?}");
        tokens.into_iter().next().unwrap()
    }

    #[test]
    fn multi_char_operators() {
        assert_eq!(
            kinds("== != <= >= :: < >"),
            vec![
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::DoubleColon,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn tilde_attaches_to_identifier() {
        let tok = single("like~");
        assert_eq!(tok.kind, TokenKind::Ident);
        assert_eq!(tok.text, "like~");
    }

    #[test]
    fn integer_vs_decimal() {
        assert_eq!(single("42").kind, TokenKind::Int);
        assert_eq!(single("42.5").kind, TokenKind::Decimal);
        assert_eq!(single("1e10").kind, TokenKind::Decimal);
        assert_eq!(single("2E-3").kind, TokenKind::Decimal);
        // A trailing dot is member access, not a decimal point.
        assert_eq!(kinds("42.a"), vec![TokenKind::Int, TokenKind::Dot, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(single(r#""a\nb""#).text, "a\nb");
        assert_eq!(single(r#""quote: \"""#).text, "quote: \"");
        assert_eq!(single(r#""\u{48}\u{49}""#).text, "HI");
        assert_eq!(single(r"'it\'s'").text, "it's");
    }

    #[test]
    fn triple_quoted_string_is_raw() {
        let tok = single(r#""""C:\path\n no escapes""""#);
        assert_eq!(tok.kind, TokenKind::Str);
        assert_eq!(tok.text, r"C:\path\n no escapes");
    }

    #[test]
    fn backtick_identifier_with_doubled_backtick() {
        let tok = single("`weird``name`");
        assert_eq!(tok.kind, TokenKind::QuotedIdent);
        assert_eq!(tok.text, "weird`name");
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = tokenize("a\n  \"oops").unwrap_err();
        assert!(matches!(err, ParseError::Lexical { line: 2, column: 3, .. }), "{err:?}");
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn invalid_escape_reports_position() {
        let err = tokenize(r#""bad \q escape""#).unwrap_err();
        assert!(err.to_string().contains("invalid escape sequence '\\q'"));
        assert!(matches!(err, ParseError::Lexical { line: 1, column: 6, .. }), "{err:?}");
    }

    #[test]
    fn unterminated_block_comment_consumes_to_eof() {
        let tokens = tokenize("a /* never closed").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Ident, TokenKind::Whitespace, TokenKind::BlockComment, TokenKind::Eof]
        );
    }

    #[test]
    fn line_comment_runs_to_end_of_line() {
        assert_eq!(kinds("a // trailing | where\nb"), vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn comments_are_hidden_but_present() {
        let tokens = tokenize("from logs // read").unwrap();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::LineComment));
    }

    #[test]
    fn position_tracking_across_lines() {
        let tokens = tokenize("from logs\n| where x").unwrap();
        let pipe = tokens.iter().find(|t| t.kind == TokenKind::Pipe).unwrap();
        assert_eq!(pipe.span.line, 2);
        assert_eq!(pipe.span.column, 1);
        let x = tokens.iter().rfind(|t| t.kind == TokenKind::Ident).unwrap();
        assert_eq!(x.span.line, 2);
        assert_eq!(x.span.column, 9);
    }

    #[test]
    fn unexpected_character_is_lexical_error() {
        let err = tokenize("a # b").unwrap_err();
        assert!(matches!(err, ParseError::Lexical { .. }));
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn tokenize_never_panics(input in ".{0,200}") {
                let _ = tokenize(&input);
            }

            #[test]
            fn identifiers_lex_to_single_token(name in "[a-zA-Z_][a-zA-Z0-9_]{0,20}") {
                let tokens = tokenize(&name).unwrap();
                prop_assert_eq!(tokens.len(), 2);
                prop_assert_eq!(tokens[0].kind, TokenKind::Ident);
                prop_assert_eq!(tokens[0].text.clone(), name);
            }

            #[test]
            fn tokens_cover_all_input(input in "[a-z0-9 |,()=<>+*/%.\"-]{0,80}") {
                if let Ok(tokens) = tokenize(&input) {
                    let mut offset = 0;
                    for token in &tokens {
                        prop_assert_eq!(token.span.start, offset);
                        offset = token.span.end;
                    }
                    prop_assert_eq!(offset, input.len());
                }
            }
        }
    }
}
