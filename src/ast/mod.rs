//! Query abstract syntax tree types.
//!
//! The AST is deliberately permissive: it represents everything the grammar
//! accepts, including constructs the current feature set forbids. The plan
//! builder enforces the restrictions and produces the smaller logical plan
//! node set from these types.

mod command;
mod expr;

pub use command::{Command, NamedExpr, Query, RenamePair, SortKey};
pub use expr::{BinaryOp, Expr, ExprKind, Literal, QualifiedName, UnaryOp};
