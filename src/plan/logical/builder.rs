//! AST to logical plan conversion.
//!
//! The grammar is deliberately permissive: array indexing, `LOOKUP` and
//! `INLINESTATS` all parse. This pass is where they are rejected, with the
//! source position of the offending construct, alongside semantic checks
//! the grammar cannot express (function registry lookups, aggregate
//! placement, constant-only `ROW` fields).

use thiserror::Error;

use crate::ast::{self, Command, Expr, ExprKind, NamedExpr, Query, SortKey};
use crate::lexer::Span;

use super::expr::{DataType, LogicalExpr, SortOrder, Value};
use super::functions::{self, FunctionKind};
use super::node::{Attribute, LogicalPlan};

/// A semantic error found while building a plan from a parsed query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A construct the grammar accepts but the planner does not implement.
    #[error("line {line}:{column}: {feature} is not supported")]
    Unsupported {
        /// Human-readable name of the construct.
        feature: String,
        /// 1-based line.
        line: u32,
        /// 1-based column.
        column: u32,
    },
    /// A function name absent from the registry.
    #[error("line {line}:{column}: unknown function [{name}]")]
    UnknownFunction {
        /// The name as written, lowercased.
        name: String,
        /// 1-based line.
        line: u32,
        /// 1-based column.
        column: u32,
    },
    /// A registered name with no implementation in this planner.
    #[error("line {line}:{column}: function [{name}] is recognized but not supported")]
    UnsupportedFunction {
        /// The name as written, lowercased.
        name: String,
        /// 1-based line.
        line: u32,
        /// 1-based column.
        column: u32,
    },
    /// An aggregate call outside a `STATS` aggregate position.
    #[error("line {line}:{column}: aggregate function [{name}] is only valid in STATS")]
    MisplacedAggregate {
        /// The aggregate name.
        name: String,
        /// 1-based line.
        line: u32,
        /// 1-based column.
        column: u32,
    },
    /// An aggregate call nested inside another aggregate's arguments.
    #[error("line {line}:{column}: aggregate function [{name}] cannot be nested")]
    NestedAggregate {
        /// The inner aggregate name.
        name: String,
        /// 1-based line.
        line: u32,
        /// 1-based column.
        column: u32,
    },
    /// A `ROW` field that does not evaluate to a constant.
    #[error("line {line}:{column}: ROW requires constant expressions")]
    NonConstantRow {
        /// 1-based line.
        line: u32,
        /// 1-based column.
        column: u32,
    },
    /// An unrecognized cast target type.
    #[error("line {line}:{column}: unknown type [{name}]")]
    UnknownType {
        /// The type name as written.
        name: String,
        /// 1-based line.
        line: u32,
        /// 1-based column.
        column: u32,
    },
    /// A `WHERE` predicate of a known non-boolean type.
    #[error("line {line}:{column}: WHERE requires a boolean predicate, found {found}")]
    NonBooleanPredicate {
        /// The predicate's type.
        found: DataType,
        /// 1-based line.
        line: u32,
        /// 1-based column.
        column: u32,
    },
    /// A `LIKE`/`RLIKE` pattern that is not a string literal.
    #[error("line {line}:{column}: pattern must be a string literal")]
    InvalidPattern {
        /// 1-based line.
        line: u32,
        /// 1-based column.
        column: u32,
    },
}

/// Result alias for plan building.
pub type PlanResult<T> = Result<T, PlanError>;

/// Where an expression sits relative to aggregation, which decides whether
/// aggregate calls are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggPosition {
    /// Aggregates are illegal here.
    Forbidden,
    /// A `STATS` aggregate: aggregate calls are legal.
    Allowed,
    /// Inside an aggregate's arguments: further aggregates are illegal.
    Inside,
}

/// Builds logical plans from parsed queries.
///
/// Holds the alias id counter, so every named output column in one plan
/// gets a distinct identity, and the declared source schema (if any). As
/// each command is translated, its expressions are bound against the
/// attributes flowing up from the input plan: a field reference an
/// attribute supplies becomes a resolved, typed [`LogicalExpr::FieldRef`];
/// anything else stays unresolved for the external source (or a node-local
/// oracle) to answer.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    next_alias_id: u32,
    schema: Vec<Attribute>,
}

/// Builds a logical plan from a parsed query.
///
/// # Errors
///
/// Returns a [`PlanError`] with the source position of the first semantic
/// violation.
pub fn build_plan(query: &Query) -> PlanResult<LogicalPlan> {
    PlanBuilder::default().build(query)
}

impl PlanBuilder {
    /// A builder whose source relations declare the given columns.
    #[must_use]
    pub fn with_schema(schema: Vec<Attribute>) -> Self {
        Self { next_alias_id: 0, schema }
    }

    /// Builds the plan for `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`] for the first semantic violation.
    pub fn build(&mut self, query: &Query) -> PlanResult<LogicalPlan> {
        let mut plan = self.build_source(&query.source)?;
        for command in &query.pipeline {
            plan = self.apply_command(plan, command)?;
        }
        Ok(plan)
    }

    fn build_source(&mut self, command: &Command) -> PlanResult<LogicalPlan> {
        match command {
            Command::From { indices, .. } => Ok(LogicalPlan::Relation {
                indices: indices.clone(),
                attributes: self.schema.clone(),
            }),
            Command::Row { fields, .. } => {
                let mut row = Vec::with_capacity(fields.len());
                for field in fields {
                    let expr = self.convert(&field.expr, AggPosition::Forbidden)?;
                    let Some(value) = expr.fold() else {
                        return Err(PlanError::NonConstantRow {
                            line: field.expr.span.line,
                            column: field.expr.span.column,
                        });
                    };
                    row.push(self.aliased(LogicalExpr::Literal(value), field));
                }
                Ok(LogicalPlan::Row { fields: row })
            }
            Command::Show { .. } => Ok(LogicalPlan::Show),
            other => unreachable!("{} cannot start a pipeline", other.name()),
        }
    }

    fn apply_command(&mut self, input: LogicalPlan, command: &Command) -> PlanResult<LogicalPlan> {
        let attrs = input.output_attributes();
        match command {
            Command::Where { predicate, .. } => {
                let converted = bind(self.convert(predicate, AggPosition::Forbidden)?, &attrs);
                match converted.data_type() {
                    DataType::Boolean | DataType::Null | DataType::Unknown => {}
                    found => {
                        return Err(PlanError::NonBooleanPredicate {
                            found,
                            line: predicate.span.line,
                            column: predicate.span.column,
                        })
                    }
                }
                Ok(input.filter(converted))
            }
            Command::Eval { fields, .. } => {
                let mut converted = Vec::with_capacity(fields.len());
                for field in fields {
                    let expr = bind(self.convert(&field.expr, AggPosition::Forbidden)?, &attrs);
                    converted.push(self.aliased(expr, field));
                }
                Ok(input.eval(converted))
            }
            Command::Stats { aggregates, groupings, .. } => {
                let mut aggs = Vec::with_capacity(aggregates.len());
                for agg in aggregates {
                    let expr = bind(self.convert(&agg.expr, AggPosition::Allowed)?, &attrs);
                    aggs.push(self.aliased(expr, agg));
                }
                let groups = groupings
                    .iter()
                    .map(|g| Ok(bind(self.convert(g, AggPosition::Forbidden)?, &attrs)))
                    .collect::<PlanResult<Vec<_>>>()?;
                Ok(input.aggregate(aggs, groups))
            }
            Command::Sort { keys, .. } => {
                let keys = keys
                    .iter()
                    .map(|k| self.convert_sort_key(k, &attrs))
                    .collect::<PlanResult<Vec<_>>>()?;
                Ok(input.order_by(keys))
            }
            Command::Limit { count, .. } => Ok(input.limit(*count)),
            Command::Keep { fields, .. } => {
                let fields = fields
                    .iter()
                    .map(|f| bind(LogicalExpr::field(f.dotted()), &attrs))
                    .collect();
                Ok(input.project(fields))
            }
            Command::Drop { fields, .. } => {
                let fields = fields
                    .iter()
                    .map(|f| bind(LogicalExpr::field(f.dotted()), &attrs))
                    .collect();
                Ok(LogicalPlan::Drop { fields, input: Box::new(input) })
            }
            // RENAME old AS new lowers to an eval of the new name followed
            // by a drop of the old one.
            Command::Rename { pairs, .. } => {
                let mut plan = input;
                for pair in pairs {
                    let attrs = plan.output_attributes();
                    let old = bind(LogicalExpr::field(pair.old.dotted()), &attrs);
                    plan = plan.eval(vec![old.clone().alias(pair.new.clone(), self.next_id())]);
                    plan = LogicalPlan::Drop { fields: vec![old], input: Box::new(plan) };
                }
                Ok(plan)
            }
            Command::Dissect { field, pattern, .. } => Ok(LogicalPlan::Dissect {
                field: bind(self.convert(field, AggPosition::Forbidden)?, &attrs),
                pattern: pattern.clone(),
                input: Box::new(input),
            }),
            Command::Grok { field, pattern, .. } => Ok(LogicalPlan::Grok {
                field: bind(self.convert(field, AggPosition::Forbidden)?, &attrs),
                pattern: pattern.clone(),
                input: Box::new(input),
            }),
            Command::MvExpand { field, .. } => Ok(LogicalPlan::MvExpand {
                field: bind(LogicalExpr::field(field.dotted()), &attrs),
                input: Box::new(input),
            }),
            Command::Enrich { policy, on, with, .. } => Ok(LogicalPlan::Enrich {
                policy: policy.clone(),
                on: on.as_ref().map(|f| bind(LogicalExpr::field(f.dotted()), &attrs)),
                with: with
                    .iter()
                    .map(|w| {
                        let field = bind(LogicalExpr::field(w.expr.to_string()), &attrs);
                        match &w.name {
                            Some(name) => field.alias(name.clone(), self.next_id()),
                            None => field,
                        }
                    })
                    .collect(),
                input: Box::new(input),
            }),
            Command::Join { index, on, .. } => Ok(LogicalPlan::Join {
                index: index.clone(),
                on: vec![bind(LogicalExpr::field(on.dotted()), &attrs)],
                input: Box::new(input),
            }),
            Command::Lookup { span, .. } => Err(unsupported("LOOKUP", *span)),
            Command::InlineStats { span, .. } => Err(unsupported("INLINESTATS", *span)),
            Command::From { span, .. } | Command::Row { span, .. } | Command::Show { span } => {
                Err(unsupported(
                    &format!("{} in pipeline position", command.name().to_uppercase()),
                    *span,
                ))
            }
        }
    }

    fn convert_sort_key(&mut self, key: &SortKey, attrs: &[Attribute]) -> PlanResult<SortOrder> {
        let expr = bind(self.convert(&key.expr, AggPosition::Forbidden)?, attrs);
        // Default null placement follows direction: nulls last when
        // ascending, nulls first when descending.
        let nulls_first = key.nulls_first.unwrap_or(!key.ascending);
        Ok(SortOrder { expr, ascending: key.ascending, nulls_first })
    }

    fn convert(&mut self, expr: &Expr, position: AggPosition) -> PlanResult<LogicalExpr> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(LogicalExpr::Literal(convert_literal(lit))),
            ExprKind::Field(name) => Ok(LogicalExpr::field(name.dotted())),
            ExprKind::Index { .. } => Err(unsupported("array indexing", expr.span)),
            ExprKind::List(_) => Err(unsupported("list literals outside IN", expr.span)),
            ExprKind::Call { name, args } => self.convert_call(name, args, expr.span, position),
            ExprKind::Binary { op, left, right } => Ok(LogicalExpr::Binary {
                op: *op,
                left: Box::new(self.convert(left, position)?),
                right: Box::new(self.convert(right, position)?),
            }),
            ExprKind::Unary { op, operand } => Ok(LogicalExpr::Unary {
                op: *op,
                operand: Box::new(self.convert(operand, position)?),
            }),
            ExprKind::Cast { expr: inner, ty } => {
                let Some(data_type) = DataType::parse(ty) else {
                    return Err(PlanError::UnknownType {
                        name: ty.clone(),
                        line: expr.span.line,
                        column: expr.span.column,
                    });
                };
                Ok(LogicalExpr::Cast {
                    expr: Box::new(self.convert(inner, position)?),
                    data_type,
                })
            }
            ExprKind::IsNull { expr: inner, negated } => Ok(LogicalExpr::IsNull {
                expr: Box::new(self.convert(inner, position)?),
                negated: *negated,
            }),
            ExprKind::In { expr: inner, list, negated, case_insensitive } => {
                Ok(LogicalExpr::In {
                    expr: Box::new(self.convert(inner, position)?),
                    list: list
                        .iter()
                        .map(|e| self.convert(e, position))
                        .collect::<PlanResult<Vec<_>>>()?,
                    negated: *negated,
                    case_insensitive: *case_insensitive,
                })
            }
            ExprKind::Like { expr: inner, pattern, negated, case_insensitive, regex } => {
                let ExprKind::Literal(ast::Literal::String(text)) = &pattern.kind else {
                    return Err(PlanError::InvalidPattern {
                        line: pattern.span.line,
                        column: pattern.span.column,
                    });
                };
                Ok(LogicalExpr::Like {
                    expr: Box::new(self.convert(inner, position)?),
                    pattern: text.clone(),
                    negated: *negated,
                    case_insensitive: *case_insensitive,
                    regex: *regex,
                })
            }
        }
    }

    fn convert_call(
        &mut self,
        name: &str,
        args: &[Expr],
        span: Span,
        position: AggPosition,
    ) -> PlanResult<LogicalExpr> {
        let lowered = name.to_ascii_lowercase();
        let argument_position = match functions::classify(&lowered) {
            FunctionKind::Aggregate => match position {
                AggPosition::Forbidden => {
                    return Err(PlanError::MisplacedAggregate {
                        name: lowered,
                        line: span.line,
                        column: span.column,
                    })
                }
                AggPosition::Inside => {
                    return Err(PlanError::NestedAggregate {
                        name: lowered,
                        line: span.line,
                        column: span.column,
                    })
                }
                AggPosition::Allowed => AggPosition::Inside,
            },
            FunctionKind::Scalar => position,
            FunctionKind::Unsupported => {
                return Err(PlanError::UnsupportedFunction {
                    name: lowered,
                    line: span.line,
                    column: span.column,
                })
            }
            FunctionKind::Unknown => {
                return Err(PlanError::UnknownFunction {
                    name: lowered,
                    line: span.line,
                    column: span.column,
                })
            }
        };
        let args = args
            .iter()
            .map(|a| self.convert(a, argument_position))
            .collect::<PlanResult<Vec<_>>>()?;
        Ok(LogicalExpr::Call { name: lowered, args })
    }

    fn aliased(&mut self, expr: LogicalExpr, named: &NamedExpr) -> LogicalExpr {
        expr.alias(named.output_name(), self.next_id())
    }

    fn next_id(&mut self) -> u32 {
        self.next_alias_id += 1;
        self.next_alias_id
    }
}

/// Binds unresolved field references against the attributes flowing up
/// from the input plan. Names no attribute supplies are left unresolved.
fn bind(expr: LogicalExpr, attrs: &[Attribute]) -> LogicalExpr {
    expr.transform_up(&|e| match e {
        LogicalExpr::FieldRef { name, data_type, resolved: false } => {
            match attrs.iter().find(|a| a.name == name) {
                Some(attr) => LogicalExpr::FieldRef {
                    name,
                    data_type: attr.data_type,
                    resolved: true,
                },
                None => LogicalExpr::FieldRef { name, data_type, resolved: false },
            }
        }
        other => other,
    })
}

fn unsupported(feature: &str, span: Span) -> PlanError {
    PlanError::Unsupported {
        feature: feature.to_string(),
        line: span.line,
        column: span.column,
    }
}

fn convert_literal(lit: &ast::Literal) -> Value {
    match lit {
        ast::Literal::Null => Value::Null(DataType::Null),
        ast::Literal::Boolean(b) => Value::Boolean(*b),
        ast::Literal::Integer(i) => Value::Integer(*i),
        ast::Literal::Decimal(d) => Value::Double(*d),
        ast::Literal::String(s) => Value::Text(s.clone()),
    }
}
