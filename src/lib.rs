//! `PipeQL`
//!
//! Front-end and logical optimizer for a piped analytics query language.
//!
//! # Overview
//!
//! A query is a source command (`FROM`, `ROW`, `SHOW`) followed by `|`-chained
//! processing commands (`WHERE`, `EVAL`, `STATS`, `SORT`, `LIMIT`, …). The
//! crate turns query text into an optimized logical plan in three stages:
//!
//! - **Lexer**: hand-written tokenizer with byte-offset spans and
//!   hidden-channel trivia
//! - **Parser**: precedence-climbing recursive descent over the token stream
//! - **Plan**: AST to logical plan conversion with semantic checks, then
//!   batch/fixpoint rule-based optimization
//!
//! # Modules
//!
//! - [`lexer`] - Tokenization and source spans
//! - [`ast`] - Parse-level expression and command types
//! - [`parser`] - Query and expression parsing
//! - [`plan`] - Logical plans, the plan builder and the optimizers
//! - [`error`] - Parse error types
//!
//! # Quick Start
//!
//! Parse a query:
//!
//! ```
//! use pipeql::parser::{parse_query, ParserConfig};
//!
//! let query = parse_query(
//!     "from logs | where status == 200 | stats count() by host | limit 10",
//!     &ParserConfig::default(),
//! ).unwrap();
//! assert_eq!(query.pipeline.len(), 3);
//! ```
//!
//! Build and optimize a logical plan:
//!
//! ```
//! use pipeql::parser::{parse_query, ParserConfig};
//! use pipeql::plan::logical::build_plan;
//! use pipeql::plan::optimize::Optimizer;
//!
//! let query = parse_query(
//!     "from logs | where 1 == 1 | limit 20 | limit 10",
//!     &ParserConfig::default(),
//! ).unwrap();
//! let plan = build_plan(&query).unwrap();
//! let optimized = Optimizer::default().optimize(plan).unwrap();
//! assert_eq!(optimized.display_tree(), "Limit[10]\n  Relation[logs]\n");
//! ```
//!
//! Re-optimize a plan fragment against what one node actually stores:
//!
//! ```
//! use pipeql::plan::logical::{LogicalExpr, LogicalPlan};
//! use pipeql::plan::optimize::LocalOptimizer;
//!
//! let plan = LogicalPlan::relation(vec!["logs".into()])
//!     .filter(LogicalExpr::field("vanished").eq(LogicalExpr::integer(1)));
//! let oracle = |name: &str| name == "status";
//! let optimized = LocalOptimizer::new(&oracle).optimize(plan).unwrap();
//! assert!(matches!(optimized, LogicalPlan::Empty { .. }));
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod plan;

pub use error::{ParseError, ParseResult};
