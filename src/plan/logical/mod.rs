//! Logical query plans.
//!
//! [`builder::build_plan`] turns a parsed [`crate::ast::Query`] into a
//! [`LogicalPlan`] tree, applying the semantic checks the permissive
//! grammar defers. Plans and their [`LogicalExpr`] expressions are
//! immutable values with structural equality, which the optimizer relies
//! on for fixpoint detection.

mod builder;
mod expr;
pub mod functions;
mod node;

pub use builder::{build_plan, PlanBuilder, PlanError, PlanResult};
pub use expr::{DataType, LogicalExpr, SortOrder, Value};
pub use node::{Attribute, LogicalPlan};
