//! Expression AST types.
//!
//! These are parse-level expressions: they mirror what the grammar accepts,
//! including constructs (array indexing, unknown functions) that the plan
//! builder later rejects. Every node carries the source span of the text it
//! was parsed from.

use std::fmt;

use crate::lexer::Span;

/// A literal value as written in the query.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `NULL`.
    Null,
    /// `TRUE` or `FALSE`.
    Boolean(bool),
    /// An integer literal.
    Integer(i64),
    /// A decimal literal.
    Decimal(f64),
    /// A string literal, escapes resolved.
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::String(s) => write!(f, "\"{s}\""),
        }
    }
}

/// A dotted field name such as `host.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// Name segments, in source order.
    pub parts: Vec<String>,
}

impl QualifiedName {
    /// Creates a name from segments.
    #[must_use]
    pub const fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }

    /// Creates a single-segment name.
    #[must_use]
    pub fn simple(name: impl Into<String>) -> Self {
        Self { parts: vec![name.into()] }
    }

    /// The full dotted form.
    #[must_use]
    pub fn dotted(&self) -> String {
        self.parts.join(".")
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dotted())
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
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
    /// `AND`
    And,
    /// `OR`
    Or,
}

impl BinaryOp {
    /// True for `==`, `!=`, `<`, `<=`, `>`, `>=`.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "and",
            Self::Or => "or",
        };
        write!(f, "{s}")
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `NOT`
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Not => write!(f, "not"),
        }
    }
}

/// The shape of an expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal value.
    Literal(Literal),
    /// A field reference.
    Field(QualifiedName),
    /// Array indexing, e.g. `events[0]`. Accepted by the grammar but
    /// rejected by the plan builder.
    Index {
        /// The indexed expression.
        expr: Box<Expr>,
        /// The index expression.
        index: Box<Expr>,
    },
    /// A function call.
    Call {
        /// Function name as written.
        name: String,
        /// Argument expressions.
        args: Vec<Expr>,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
    },
    /// A `::type` cast.
    Cast {
        /// The cast operand.
        expr: Box<Expr>,
        /// Target type name as written.
        ty: String,
    },
    /// A bracketed list, e.g. `[1, 2, 3]`.
    List(Vec<Expr>),
    /// `expr IS [NOT] NULL`.
    IsNull {
        /// The tested expression.
        expr: Box<Expr>,
        /// True for `IS NOT NULL`.
        negated: bool,
    },
    /// `expr [NOT] IN (…)` or the case-insensitive `in~` variant.
    In {
        /// The tested expression.
        expr: Box<Expr>,
        /// Candidate values.
        list: Vec<Expr>,
        /// True for `NOT IN`.
        negated: bool,
        /// True for the `in~` operator.
        case_insensitive: bool,
    },
    /// `expr [NOT] LIKE pattern` / `expr [NOT] RLIKE pattern`, with
    /// `like~`/`rlike~` case-insensitive variants.
    Like {
        /// The tested expression.
        expr: Box<Expr>,
        /// The pattern expression (a string literal in practice).
        pattern: Box<Expr>,
        /// True for the negated form.
        negated: bool,
        /// True for the `~` variant.
        case_insensitive: bool,
        /// True for `RLIKE` (regular expression match).
        regex: bool,
    },
}

/// An expression together with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// The expression shape.
    pub kind: ExprKind,
    /// Source position of the full expression.
    pub span: Span,
}

impl Expr {
    /// Creates an expression node.
    #[must_use]
    pub const fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Creates a literal expression.
    #[must_use]
    pub const fn literal(value: Literal, span: Span) -> Self {
        Self::new(ExprKind::Literal(value), span)
    }

    /// Creates a field reference.
    #[must_use]
    pub const fn field(name: QualifiedName, span: Span) -> Self {
        Self::new(ExprKind::Field(name), span)
    }

    /// Creates a binary expression spanning both operands.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let span = left.span.to(right.span);
        Self::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, span)
    }

    /// Creates a unary expression.
    #[must_use]
    pub fn unary(op: UnaryOp, operand: Expr, op_span: Span) -> Self {
        let span = op_span.to(operand.span);
        Self::new(ExprKind::Unary { op, operand: Box::new(operand) }, span)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => write!(f, "{lit}"),
            ExprKind::Field(name) => write!(f, "{name}"),
            ExprKind::Index { expr, index } => write!(f, "{expr}[{index}]"),
            ExprKind::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            ExprKind::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            ExprKind::Unary { op, operand } => write!(f, "({op} {operand})"),
            ExprKind::Cast { expr, ty } => write!(f, "{expr}::{ty}"),
            ExprKind::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            ExprKind::IsNull { expr, negated } => {
                write!(f, "{expr} is {}null", if *negated { "not " } else { "" })
            }
            ExprKind::In { expr, list, negated, case_insensitive } => {
                let op = if *case_insensitive { "in~" } else { "in" };
                write!(f, "{expr} {}{op} (", if *negated { "not " } else { "" })?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            ExprKind::Like { expr, pattern, negated, case_insensitive, regex } => {
                let base = if *regex { "rlike" } else { "like" };
                let tilde = if *case_insensitive { "~" } else { "" };
                write!(f, "{expr} {}{base}{tilde} {pattern}", if *negated { "not " } else { "" })
            }
        }
    }
}
