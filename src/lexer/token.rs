//! Token and span types produced by the lexer.

use std::fmt;

/// A half-open byte range in the source text, with the line and column of
/// its first character.
///
/// Every token and AST node carries a span so diagnostics can point at the
/// exact source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// 1-based source line of the first character.
    pub line: u32,
    /// 1-based source column of the first character.
    pub column: u32,
}

impl Span {
    /// Creates a span covering a byte range at a known position.
    #[must_use]
    pub const fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self { start, end, line, column }
    }

    /// Returns a span covering both `self` and `other`.
    ///
    /// Position data is taken from `self`, which must be the earlier span.
    #[must_use]
    pub fn to(self, other: Span) -> Span {
        Span { start: self.start, end: other.end.max(self.end), ..self }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The classification of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A bare identifier or keyword, including tilde-suffixed variants
    /// such as `like~`. Keyword recognition happens in the parser.
    Ident,
    /// A backtick-quoted identifier, with backtick escapes resolved.
    QuotedIdent,
    /// A string literal, with escapes resolved.
    Str,
    /// An integer literal.
    Int,
    /// A decimal literal (contains a `.` or an exponent).
    Decimal,

    /// `|`
    Pipe,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `=`
    Assign,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `::`
    DoubleColon,

    /// A `//` comment running to end of line (hidden channel).
    LineComment,
    /// A `/* ... */` comment (hidden channel).
    BlockComment,
    /// A run of whitespace (hidden channel).
    Whitespace,

    /// End of input. Always the last token in a stream.
    Eof,
}

impl TokenKind {
    /// Returns true for hidden-channel tokens the parser never sees.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(self, Self::LineComment | Self::BlockComment | Self::Whitespace)
    }

    /// A human-readable description used in syntax error messages.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Ident => "identifier",
            Self::QuotedIdent => "quoted identifier",
            Self::Str => "string",
            Self::Int => "integer",
            Self::Decimal => "decimal",
            Self::Pipe => "'|'",
            Self::Comma => "','",
            Self::Dot => "'.'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::Assign => "'='",
            Self::Eq => "'=='",
            Self::NotEq => "'!='",
            Self::Lt => "'<'",
            Self::LtEq => "'<='",
            Self::Gt => "'>'",
            Self::GtEq => "'>='",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Percent => "'%'",
            Self::DoubleColon => "'::'",
            Self::LineComment => "comment",
            Self::BlockComment => "comment",
            Self::Whitespace => "whitespace",
            Self::Eof => "end of query",
        }
    }
}

/// A single lexed token.
///
/// `text` holds the token's resolved content: for strings and quoted
/// identifiers the quotes are stripped and escapes are processed; for
/// everything else it is the raw source slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token classification.
    pub kind: TokenKind,
    /// Resolved token text.
    pub text: String,
    /// Source position.
    pub span: Span,
}

impl Token {
    /// Creates a token.
    #[must_use]
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self { kind, text: text.into(), span }
    }

    /// Case-insensitive keyword comparison for identifier tokens.
    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Ident && self.text.eq_ignore_ascii_case(keyword)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of query"),
            TokenKind::Str => write!(f, "'{}'", self.text),
            _ => write!(f, "{}", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_join() {
        let a = Span::new(0, 4, 1, 1);
        let b = Span::new(5, 9, 1, 6);
        let joined = a.to(b);
        assert_eq!(joined.start, 0);
        assert_eq!(joined.end, 9);
        assert_eq!(joined.line, 1);
        assert_eq!(joined.column, 1);
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let tok = Token::new(TokenKind::Ident, "WHERE", Span::new(0, 5, 1, 1));
        assert!(tok.is_keyword("where"));
        assert!(tok.is_keyword("WHERE"));
        assert!(!tok.is_keyword("eval"));
    }

    #[test]
    fn quoted_ident_is_not_a_keyword() {
        let tok = Token::new(TokenKind::QuotedIdent, "where", Span::new(0, 7, 1, 1));
        assert!(!tok.is_keyword("where"));
    }
}
