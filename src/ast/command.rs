//! Command and query AST types.
//!
//! A query is one source command followed by a pipeline of processing
//! commands. Each variant matches one grammar production; constructs the
//! current feature set does not support (`LOOKUP`, `INLINESTATS`) still
//! parse into their own variants and are rejected by the plan builder,
//! keeping error messages precise.

use std::fmt;

use crate::lexer::Span;

use super::expr::{Expr, QualifiedName};

/// An optionally named expression, as written in `EVAL`, `STATS` and `ROW`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedExpr {
    /// Explicit name (`name = expr`), if given.
    pub name: Option<String>,
    /// The expression.
    pub expr: Expr,
    /// Source span of the whole entry.
    pub span: Span,
}

impl NamedExpr {
    /// The output column name: the explicit name, or the expression text.
    #[must_use]
    pub fn output_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.expr.to_string())
    }
}

/// One `SORT` key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// The sort expression.
    pub expr: Expr,
    /// True for `ASC` (the default).
    pub ascending: bool,
    /// Explicit `NULLS FIRST`/`NULLS LAST`, if given.
    pub nulls_first: Option<bool>,
    /// Source span of the whole key.
    pub span: Span,
}

/// One `RENAME old AS new` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RenamePair {
    /// The existing field.
    pub old: QualifiedName,
    /// The new name.
    pub new: String,
    /// Source span of the pair.
    pub span: Span,
}

/// A single command in a query pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Source command `FROM index[, index…]`.
    From {
        /// Index names to read.
        indices: Vec<String>,
        /// Source span.
        span: Span,
    },
    /// Source command `ROW name = expr[, …]`, producing one literal row.
    Row {
        /// The row's fields.
        fields: Vec<NamedExpr>,
        /// Source span.
        span: Span,
    },
    /// Source command `SHOW INFO`.
    Show {
        /// Source span.
        span: Span,
    },
    /// `WHERE predicate`.
    Where {
        /// The filter predicate.
        predicate: Expr,
        /// Source span.
        span: Span,
    },
    /// `EVAL name = expr[, …]`.
    Eval {
        /// Computed columns.
        fields: Vec<NamedExpr>,
        /// Source span.
        span: Span,
    },
    /// `STATS agg[, …] [BY grouping[, …]]`.
    Stats {
        /// Aggregate expressions.
        aggregates: Vec<NamedExpr>,
        /// Grouping expressions.
        groupings: Vec<Expr>,
        /// Source span.
        span: Span,
    },
    /// `SORT key[, …]`.
    Sort {
        /// Sort keys in priority order.
        keys: Vec<SortKey>,
        /// Source span.
        span: Span,
    },
    /// `LIMIT n`.
    Limit {
        /// Maximum number of rows.
        count: i64,
        /// Source span.
        span: Span,
    },
    /// `KEEP field[, …]`.
    Keep {
        /// Fields to keep, in output order.
        fields: Vec<QualifiedName>,
        /// Source span.
        span: Span,
    },
    /// `DROP field[, …]`.
    Drop {
        /// Fields to remove.
        fields: Vec<QualifiedName>,
        /// Source span.
        span: Span,
    },
    /// `RENAME old AS new[, …]`.
    Rename {
        /// Rename pairs, applied left to right.
        pairs: Vec<RenamePair>,
        /// Source span.
        span: Span,
    },
    /// `DISSECT field "pattern"`.
    Dissect {
        /// The input field expression.
        field: Expr,
        /// The dissect pattern.
        pattern: String,
        /// Source span.
        span: Span,
    },
    /// `GROK field "pattern"`.
    Grok {
        /// The input field expression.
        field: Expr,
        /// The grok pattern.
        pattern: String,
        /// Source span.
        span: Span,
    },
    /// `MV_EXPAND field`.
    MvExpand {
        /// The multi-valued field to expand.
        field: QualifiedName,
        /// Source span.
        span: Span,
    },
    /// `ENRICH policy [ON match_field] [WITH [new =] field, …]`.
    Enrich {
        /// The enrich policy name.
        policy: String,
        /// The match field, if explicit.
        on: Option<QualifiedName>,
        /// Enrichment fields to add.
        with: Vec<NamedExpr>,
        /// Source span.
        span: Span,
    },
    /// `JOIN index ON field` (dev-gated).
    Join {
        /// The lookup index.
        index: String,
        /// The join key field.
        on: QualifiedName,
        /// Source span.
        span: Span,
    },
    /// `LOOKUP index ON field[, …]` (dev-gated); parses but is rejected by
    /// the plan builder.
    Lookup {
        /// The lookup table.
        index: String,
        /// Match fields.
        on: Vec<QualifiedName>,
        /// Source span.
        span: Span,
    },
    /// `INLINESTATS agg[, …] [BY …]` (dev-gated); parses but is rejected by
    /// the plan builder.
    InlineStats {
        /// Aggregate expressions.
        aggregates: Vec<NamedExpr>,
        /// Grouping expressions.
        groupings: Vec<Expr>,
        /// Source span.
        span: Span,
    },
}

impl Command {
    /// The command keyword, normalized to lowercase.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::From { .. } => "from",
            Self::Row { .. } => "row",
            Self::Show { .. } => "show",
            Self::Where { .. } => "where",
            Self::Eval { .. } => "eval",
            Self::Stats { .. } => "stats",
            Self::Sort { .. } => "sort",
            Self::Limit { .. } => "limit",
            Self::Keep { .. } => "keep",
            Self::Drop { .. } => "drop",
            Self::Rename { .. } => "rename",
            Self::Dissect { .. } => "dissect",
            Self::Grok { .. } => "grok",
            Self::MvExpand { .. } => "mv_expand",
            Self::Enrich { .. } => "enrich",
            Self::Join { .. } => "join",
            Self::Lookup { .. } => "lookup",
            Self::InlineStats { .. } => "inlinestats",
        }
    }

    /// Source span of the command.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::From { span, .. }
            | Self::Row { span, .. }
            | Self::Show { span }
            | Self::Where { span, .. }
            | Self::Eval { span, .. }
            | Self::Stats { span, .. }
            | Self::Sort { span, .. }
            | Self::Limit { span, .. }
            | Self::Keep { span, .. }
            | Self::Drop { span, .. }
            | Self::Rename { span, .. }
            | Self::Dissect { span, .. }
            | Self::Grok { span, .. }
            | Self::MvExpand { span, .. }
            | Self::Enrich { span, .. }
            | Self::Join { span, .. }
            | Self::Lookup { span, .. }
            | Self::InlineStats { span, .. } => *span,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A full parsed query: one source command plus a processing pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// The source command (`FROM`, `ROW` or `SHOW`).
    pub source: Command,
    /// Processing commands in pipe order.
    pub pipeline: Vec<Command>,
    /// Span of the whole query.
    pub span: Span,
}
