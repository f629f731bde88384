//! Lexer for the pipe query language.
//!
//! Turns raw source text into a flat token stream. Strings, quoted
//! identifiers, comments and multi-character operators are resolved here;
//! keyword recognition is left to the parser so that keywords stay usable
//! as field names where the grammar allows it.

mod scan;
mod token;

pub use scan::tokenize;
pub use token::{Span, Token, TokenKind};
