//! Error types for query parsing.
//!
//! Every parse-stage failure carries the line and column of the offending
//! source position so callers can map errors back to the query text. The
//! plan and optimizer layers define their own error enums next to the code
//! that raises them (see [`crate::plan::logical::PlanError`] and
//! [`crate::plan::optimize::OptimizeError`]).

use thiserror::Error;

/// Errors that can occur while turning query text into an AST.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A malformed token: unterminated string, bad escape sequence,
    /// unterminated backtick identifier.
    #[error("line {line}:{column}: {message}")]
    Lexical {
        /// Description of the lexical problem.
        message: String,
        /// 1-based line of the offending character.
        line: u32,
        /// 1-based column of the offending character.
        column: u32,
    },

    /// The token stream does not match the grammar.
    #[error("line {line}:{column}: expected {expected}, found {found}")]
    Syntax {
        /// What the parser was prepared to accept.
        expected: String,
        /// The token actually seen.
        found: String,
        /// 1-based line of the offending token.
        line: u32,
        /// 1-based column of the offending token.
        column: u32,
    },

    /// Expression nesting exceeded the configured depth cap.
    ///
    /// Raised instead of letting a pathological input exhaust the stack.
    #[error("line {line}:{column}: query too large (expression nesting exceeds {max_depth})")]
    TooLarge {
        /// The configured nesting cap that was exceeded.
        max_depth: usize,
        /// 1-based line where the cap was hit.
        line: u32,
        /// 1-based column where the cap was hit.
        column: u32,
    },

    /// The query string contains no commands.
    #[error("empty query")]
    EmptyQuery,
}

impl ParseError {
    /// Returns the 1-based source line, if the error carries position data.
    #[must_use]
    pub const fn line(&self) -> Option<u32> {
        match self {
            Self::Lexical { line, .. }
            | Self::Syntax { line, .. }
            | Self::TooLarge { line, .. } => Some(*line),
            Self::EmptyQuery => None,
        }
    }

    /// Returns the 1-based source column, if the error carries position data.
    #[must_use]
    pub const fn column(&self) -> Option<u32> {
        match self {
            Self::Lexical { column, .. }
            | Self::Syntax { column, .. }
            | Self::TooLarge { column, .. } => Some(*column),
            Self::EmptyQuery => None,
        }
    }
}

/// Result type for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;
