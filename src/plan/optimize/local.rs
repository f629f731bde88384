//! Node-local plan optimization.
//!
//! After distribution, each data node re-optimizes its fragment of the
//! plan against what it actually stores. The [`FieldOracle`] answers
//! whether a field exists locally; unresolved references to fields the
//! node does not store are replaced with typed nulls, which in turn lets
//! the empty-propagation rules collapse whole subtrees. Aggregations over
//! provably empty local inputs are rewritten into the intermediate-state
//! row the coordinator expects from a partial aggregation.

use std::cell::Cell;

use tracing::debug;

use crate::plan::logical::{
    functions, DataType, LogicalExpr, LogicalPlan, Value,
};

use super::{
    fold_constants, propagate_empty, simplify_filters, Batch, BatchLimit, Optimizer,
    OptimizeError, OptimizerConfig, Rule,
};

/// Answers which fields a node can provide.
///
/// Implementations are expected to be cheap and consistent for the
/// lifetime of one optimization run.
pub trait FieldOracle {
    /// True when the node stores a field with this name.
    fn has_field(&self, name: &str) -> bool;
}

impl<T: Fn(&str) -> bool> FieldOracle for T {
    fn has_field(&self, name: &str) -> bool {
        self(name)
    }
}

/// Re-optimizes a plan fragment for one data node.
pub struct LocalOptimizer<'a> {
    oracle: &'a dyn FieldOracle,
    config: OptimizerConfig,
}

impl<'a> LocalOptimizer<'a> {
    /// A local optimizer over the given oracle.
    #[must_use]
    pub fn new(oracle: &'a dyn FieldOracle) -> Self {
        Self { oracle, config: OptimizerConfig::default() }
    }

    /// Overrides the iteration cap.
    #[must_use]
    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the local rewrites.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::NonTermination`] when the local batch
    /// exhausts its iteration cap.
    pub fn optimize(&self, plan: LogicalPlan) -> Result<LogicalPlan, OptimizeError> {
        let substituted = self.replace_missing_fields(plan);
        let cap = self.config.max_iterations;
        let batches = vec![Batch::new(
            "local rewrites",
            BatchLimit::FixedPoint(cap),
            vec![
                fold_constants(),
                simplify_filters(),
                propagate_empty(),
                aggregate_over_empty_partial(),
            ],
        )];
        Optimizer::new(batches).optimize(substituted)
    }

    /// Replaces references to fields the node does not store with typed
    /// nulls.
    ///
    /// Only unresolved references are candidates: a resolved reference is
    /// bound to an attribute the plan itself computes (an eval, aggregate,
    /// row or enrich output), which exists regardless of what the oracle
    /// says. Project nodes keep their field lists intact; a missing
    /// projected field instead gets a null-producing eval inserted beneath
    /// the projection, so output names and order are preserved.
    fn replace_missing_fields(&self, plan: LogicalPlan) -> LogicalPlan {
        let next_id = Cell::new(max_alias_id(&plan));
        let missing = |name: &str| !self.oracle.has_field(name);

        plan.transform_up(&|node| match node {
            LogicalPlan::Project { fields, input } => {
                let absent: Vec<&LogicalExpr> = fields
                    .iter()
                    .filter(|f| {
                        matches!(
                            f,
                            LogicalExpr::FieldRef { name, resolved: false, .. } if missing(name)
                        )
                    })
                    .collect();
                if absent.is_empty() {
                    return LogicalPlan::Project { fields, input };
                }
                debug!(count = absent.len(), "projected fields missing locally");
                let nulls = absent
                    .iter()
                    .map(|f| {
                        next_id.set(next_id.get() + 1);
                        LogicalExpr::null(f.data_type()).alias(f.output_name(), next_id.get())
                    })
                    .collect();
                LogicalPlan::Project { fields, input: Box::new(input.eval(nulls)) }
            }
            holder @ (LogicalPlan::Filter { .. }
            | LogicalPlan::Eval { .. }
            | LogicalPlan::Aggregate { .. }
            | LogicalPlan::OrderBy { .. }
            | LogicalPlan::TopN { .. }) => holder.map_expressions(&|expr| {
                if expr.resolved() {
                    return expr;
                }
                expr.transform_up(&|e| match e {
                    LogicalExpr::FieldRef { ref name, data_type, resolved: false }
                        if missing(name) =>
                    {
                        LogicalExpr::null(null_type(data_type))
                    }
                    other => other,
                })
            }),
            other => other,
        })
    }
}

impl std::fmt::Debug for LocalOptimizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalOptimizer").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Rewrites a global aggregation over a locally empty input into the one
/// intermediate-state row a partial aggregation ships to the coordinator:
/// each aggregate's empty-input value followed by a per-aggregate `$seen`
/// marker set to true.
#[must_use]
pub fn aggregate_over_empty_partial() -> Rule {
    Rule::new("aggregate-over-empty-partial", |plan| {
        let next_id = Cell::new(max_alias_id(&plan));
        plan.transform_up(&|node| {
            let child_is_empty =
                matches!(node.children().first(), Some(LogicalPlan::Empty { .. }));
            match node {
                LogicalPlan::Aggregate { aggregates, groupings, input } if child_is_empty => {
                    if groupings.is_empty() {
                        LogicalPlan::Row {
                            fields: partial_state_fields(&aggregates, &next_id),
                        }
                    } else {
                        LogicalPlan::Aggregate { aggregates, groupings, input }.as_empty()
                    }
                }
                other => other,
            }
        })
    })
}

fn partial_state_fields(aggregates: &[LogicalExpr], next_id: &Cell<u32>) -> Vec<LogicalExpr> {
    let mint = || {
        next_id.set(next_id.get() + 1);
        next_id.get()
    };
    let mut fields = Vec::with_capacity(aggregates.len() * 2);
    for aggregate in aggregates {
        let (name, id, inner) = match aggregate {
            LogicalExpr::Alias { name, id, expr } => (name.clone(), *id, expr.as_ref()),
            other => (other.output_name(), mint(), other),
        };
        let value = match inner {
            LogicalExpr::Call { name, args } => functions::value_over_empty(name, args),
            other => other.fold().unwrap_or(Value::Null(DataType::Unknown)),
        };
        fields.push(LogicalExpr::Literal(value).alias(name.clone(), id));
        fields.push(LogicalExpr::boolean(true).alias(format!("{name}$seen"), mint()));
    }
    fields
}

/// The largest alias id anywhere in the plan, so synthetic columns can
/// mint fresh ones without colliding.
fn max_alias_id(plan: &LogicalPlan) -> u32 {
    fn expr_max(expr: &LogicalExpr) -> u32 {
        let own = match expr {
            LogicalExpr::Alias { id, .. } => *id,
            _ => 0,
        };
        expr.children().into_iter().map(expr_max).fold(own, u32::max)
    }
    let own = plan.expressions().into_iter().map(expr_max).fold(0, u32::max);
    plan.children().into_iter().map(max_alias_id).fold(own, u32::max)
}

/// Dotted-path nulls keep the declared type when one is known.
const fn null_type(data_type: DataType) -> DataType {
    match data_type {
        DataType::Unknown => DataType::Null,
        known => known,
    }
}
