//! The standard rewrite rules.
//!
//! Every rule is a pure bottom-up plan transform built with
//! [`LogicalPlan::transform_up`]. Rules only ever rewrite the node they
//! match; cascading effects (a filter that becomes foldable after a merge,
//! an empty relation surfacing under a new parent) are picked up by the
//! fixpoint loop around the batch.

use crate::plan::logical::{
    functions::{self, FunctionKind},
    LogicalExpr, LogicalPlan, Value,
};

use super::{Batch, BatchLimit, OptimizerConfig, Rule};

/// The standard batch list.
#[must_use]
pub fn default_batches(config: &OptimizerConfig) -> Vec<Batch> {
    let cap = config.max_iterations;
    vec![
        Batch::new(
            "operator simplification",
            BatchLimit::FixedPoint(cap),
            vec![
                split_topn(),
                fold_constants(),
                simplify_filters(),
                merge_filters(),
                push_down_filters(),
                merge_limits(),
            ],
        ),
        Batch::new(
            "empty propagation",
            BatchLimit::FixedPoint(cap),
            vec![propagate_empty(), aggregate_over_empty(), fold_constants()],
        ),
    ]
}

/// Replaces every foldable non-literal expression with its constant value.
///
/// Alias wrappers are kept: they carry output names.
#[must_use]
pub fn fold_constants() -> Rule {
    Rule::new("fold-constants", |plan| {
        plan.transform_up(&|node| {
            node.map_expressions(&|expr| {
                expr.transform_up(&|e| match e {
                    keep @ (LogicalExpr::Literal(_) | LogicalExpr::Alias { .. }) => keep,
                    other => match other.fold() {
                        Some(value) => LogicalExpr::Literal(value),
                        None => other,
                    },
                })
            })
        })
    })
}

/// Removes always-true filters and turns always-false (or null) filters
/// into an empty relation with the same schema.
#[must_use]
pub fn simplify_filters() -> Rule {
    Rule::new("simplify-filters", |plan| {
        plan.transform_up(&|node| match node {
            LogicalPlan::Filter { predicate, input } => match predicate.fold() {
                Some(Value::Boolean(true)) => *input,
                Some(Value::Boolean(false) | Value::Null(_)) => input.as_empty(),
                _ => LogicalPlan::Filter { predicate, input },
            },
            other => other,
        })
    })
}

/// Collapses adjacent filters into one conjunction, inner predicate first.
#[must_use]
pub fn merge_filters() -> Rule {
    Rule::new("merge-filters", |plan| {
        plan.transform_up(&|node| match node {
            LogicalPlan::Filter { predicate: outer, input } => match *input {
                LogicalPlan::Filter { predicate: inner, input: grandchild } => {
                    LogicalPlan::Filter { predicate: inner.and(outer), input: grandchild }
                }
                other => LogicalPlan::Filter { predicate: outer, input: Box::new(other) },
            },
            other => other,
        })
    })
}

/// Moves filters below operators that do not change which rows exist.
///
/// Sorts never affect a predicate. Evals and drops are crossed only when
/// the predicate references none of the columns they compute or remove:
/// below the operator those names mean something else (or exist again).
#[must_use]
pub fn push_down_filters() -> Rule {
    Rule::new("push-down-filters", |plan| {
        plan.transform_up(&|node| match node {
            LogicalPlan::Filter { predicate, input } => match *input {
                LogicalPlan::OrderBy { keys, input: inner } => LogicalPlan::OrderBy {
                    keys,
                    input: Box::new(inner.filter(predicate)),
                },
                LogicalPlan::Eval { fields, input: inner } => {
                    if references_any(&predicate, &fields) {
                        LogicalPlan::Eval { fields, input: inner }.filter(predicate)
                    } else {
                        LogicalPlan::Eval {
                            fields,
                            input: Box::new(inner.filter(predicate)),
                        }
                    }
                }
                LogicalPlan::Drop { fields, input: inner } => {
                    if references_any(&predicate, &fields) {
                        LogicalPlan::Drop { fields, input: inner }.filter(predicate)
                    } else {
                        LogicalPlan::Drop {
                            fields,
                            input: Box::new(inner.filter(predicate)),
                        }
                    }
                }
                other => other.filter(predicate),
            },
            other => other,
        })
    })
}

fn references_any(predicate: &LogicalExpr, columns: &[LogicalExpr]) -> bool {
    let mut referenced = Vec::new();
    predicate.collect_field_names(&mut referenced);
    let names: Vec<_> = columns.iter().map(LogicalExpr::output_name).collect();
    referenced.iter().any(|name| names.contains(name))
}

/// Collapses adjacent limits, keeping the smaller count.
#[must_use]
pub fn merge_limits() -> Rule {
    Rule::new("merge-limits", |plan| {
        plan.transform_up(&|node| match node {
            LogicalPlan::Limit { count, input } => match *input {
                LogicalPlan::Limit { count: inner_count, input: grandchild } => {
                    LogicalPlan::Limit { count: count.min(inner_count), input: grandchild }
                }
                other => other.limit(count),
            },
            other => other,
        })
    })
}

/// Splits a fused `TopN` into the canonical `Limit` over `OrderBy` shape.
#[must_use]
pub fn split_topn() -> Rule {
    Rule::new("split-topn", |plan| {
        plan.transform_up(&|node| match node {
            LogicalPlan::TopN { keys, count, input } => LogicalPlan::OrderBy {
                keys,
                input,
            }
            .limit(count),
            other => other,
        })
    })
}

/// Propagates empty inputs upward through row-shaping operators, keeping
/// each replaced node's output schema. Aggregations are excluded: a global
/// aggregation over no rows still produces one row.
#[must_use]
pub fn propagate_empty() -> Rule {
    Rule::new("propagate-empty", |plan| {
        plan.transform_up(&|node| {
            let child_is_empty =
                matches!(node.children().first(), Some(LogicalPlan::Empty { .. }));
            match node {
                LogicalPlan::Limit { count: 0, input } => input.as_empty(),
                shaped @ (LogicalPlan::Filter { .. }
                | LogicalPlan::Eval { .. }
                | LogicalPlan::Drop { .. }
                | LogicalPlan::Project { .. }
                | LogicalPlan::OrderBy { .. }
                | LogicalPlan::Limit { .. }
                | LogicalPlan::TopN { .. }
                | LogicalPlan::Dissect { .. }
                | LogicalPlan::Grok { .. }
                | LogicalPlan::MvExpand { .. }
                | LogicalPlan::Enrich { .. }
                | LogicalPlan::Join { .. })
                    if child_is_empty =>
                {
                    shaped.as_empty()
                }
                other => other,
            }
        })
    })
}

/// Replaces aggregations over empty inputs with their literal results.
///
/// With groupings there are no groups, so the result is empty. Without
/// groupings the result is exactly one row of per-function defaults:
/// `count` over rows that cannot be null is zero, everything else is a
/// typed null. Scalar expressions wrapped around the aggregates are folded
/// after substitution.
#[must_use]
pub fn aggregate_over_empty() -> Rule {
    Rule::new("aggregate-over-empty", |plan| {
        plan.transform_up(&|node| {
            let child_is_empty =
                matches!(node.children().first(), Some(LogicalPlan::Empty { .. }));
            match node {
                LogicalPlan::Aggregate { aggregates, groupings, input } if child_is_empty => {
                    if groupings.is_empty() {
                        LogicalPlan::Row {
                            fields: aggregates
                                .into_iter()
                                .map(substitute_empty_aggregates)
                                .collect(),
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

fn substitute_empty_aggregates(expr: LogicalExpr) -> LogicalExpr {
    match expr {
        LogicalExpr::Alias { name, id, expr } => {
            LogicalExpr::Alias { name, id, expr: Box::new(substitute_empty_aggregates(*expr)) }
        }
        other => {
            let replaced = other.transform_up(&|e| {
                if let LogicalExpr::Call { name, args } = &e {
                    if functions::classify(name) == FunctionKind::Aggregate {
                        return LogicalExpr::Literal(functions::value_over_empty(name, args));
                    }
                }
                e
            });
            replaced.fold().map_or(replaced, LogicalExpr::Literal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::logical::{Attribute, DataType};

    fn relation() -> LogicalPlan {
        LogicalPlan::relation(vec!["logs".into()])
    }

    #[test]
    fn folds_constant_predicates() {
        let plan = relation().filter(
            LogicalExpr::integer(1).add(LogicalExpr::integer(1)).eq(LogicalExpr::integer(2)),
        );
        let folded = fold_constants().apply(plan);
        assert_eq!(folded, relation().filter(LogicalExpr::boolean(true)));
    }

    #[test]
    fn folding_keeps_aliases() {
        let plan = LogicalPlan::Row {
            fields: vec![LogicalExpr::integer(1).alias("a", 1)],
        }
        .eval(vec![LogicalExpr::integer(2).mul(LogicalExpr::integer(3)).alias("b", 2)]);
        let folded = fold_constants().apply(plan);
        let LogicalPlan::Eval { fields, .. } = folded else { panic!("expected Eval") };
        assert_eq!(fields[0], LogicalExpr::integer(6).alias("b", 2));
    }

    #[test]
    fn true_filter_disappears() {
        let plan = relation().filter(LogicalExpr::boolean(true));
        assert_eq!(simplify_filters().apply(plan), relation());
    }

    #[test]
    fn false_filter_becomes_empty() {
        let plan = relation().filter(LogicalExpr::boolean(false));
        assert_eq!(simplify_filters().apply(plan), LogicalPlan::Empty { attributes: vec![] });
    }

    #[test]
    fn null_filter_becomes_empty() {
        let plan = relation().filter(LogicalExpr::null(DataType::Boolean));
        assert!(matches!(simplify_filters().apply(plan), LogicalPlan::Empty { .. }));
    }

    #[test]
    fn adjacent_filters_merge_inner_first() {
        let inner = LogicalExpr::field("a").gt(LogicalExpr::integer(1));
        let outer = LogicalExpr::field("b").lt(LogicalExpr::integer(2));
        let plan = relation().filter(inner.clone()).filter(outer.clone());
        assert_eq!(merge_filters().apply(plan), relation().filter(inner.and(outer)));
    }

    #[test]
    fn filter_crosses_sort() {
        use crate::plan::logical::SortOrder;
        let predicate = LogicalExpr::field("a").gt(LogicalExpr::integer(1));
        let plan =
            relation().order_by(vec![SortOrder::asc(LogicalExpr::field("a"))]).filter(predicate.clone());
        let pushed = push_down_filters().apply(plan);
        assert_eq!(
            pushed,
            relation().filter(predicate).order_by(vec![SortOrder::asc(LogicalExpr::field("a"))])
        );
    }

    #[test]
    fn filter_crosses_eval_only_when_independent() {
        let eval_fields = vec![LogicalExpr::field("a").mul(LogicalExpr::integer(2)).alias("x", 1)];
        let independent = LogicalExpr::field("a").gt(LogicalExpr::integer(1));
        let plan = relation().eval(eval_fields.clone()).filter(independent.clone());
        assert_eq!(
            push_down_filters().apply(plan),
            relation().filter(independent).eval(eval_fields.clone())
        );

        let dependent = LogicalExpr::field("x").gt(LogicalExpr::integer(1));
        let plan = relation().eval(eval_fields.clone()).filter(dependent.clone());
        assert_eq!(
            push_down_filters().apply(plan),
            relation().eval(eval_fields).filter(dependent)
        );
    }

    #[test]
    fn filter_crosses_drop_only_when_independent() {
        let drop = |input: LogicalPlan| LogicalPlan::Drop {
            fields: vec![LogicalExpr::field("tmp")],
            input: Box::new(input),
        };

        let independent = LogicalExpr::field("a").gt(LogicalExpr::integer(1));
        let plan = drop(relation()).filter(independent.clone());
        assert_eq!(push_down_filters().apply(plan), drop(relation().filter(independent)));

        // Below the drop the removed column exists again, so a predicate
        // over it must stay above.
        let dependent = LogicalExpr::field("tmp").gt(LogicalExpr::integer(1));
        let plan = drop(relation()).filter(dependent.clone());
        assert_eq!(push_down_filters().apply(plan), drop(relation()).filter(dependent));
    }

    #[test]
    fn limits_keep_the_smaller_count() {
        assert_eq!(merge_limits().apply(relation().limit(10).limit(20)), relation().limit(10));
        assert_eq!(merge_limits().apply(relation().limit(20).limit(10)), relation().limit(10));
    }

    #[test]
    fn topn_splits_into_limit_over_sort() {
        use crate::plan::logical::SortOrder;
        let keys = vec![SortOrder::desc(LogicalExpr::field("bytes"))];
        let plan = LogicalPlan::TopN {
            keys: keys.clone(),
            count: 5,
            input: Box::new(relation()),
        };
        assert_eq!(split_topn().apply(plan), relation().order_by(keys).limit(5));
    }

    #[test]
    fn empty_propagates_through_shaping_operators() {
        let empty = LogicalPlan::Empty {
            attributes: vec![Attribute::new("a", DataType::Integer)],
        };
        let plan = empty
            .clone()
            .filter(LogicalExpr::field("a").gt(LogicalExpr::integer(0)))
            .limit(10);
        // Bottom-up traversal carries the empty all the way in one pass.
        assert_eq!(propagate_empty().apply(plan), empty);
    }

    #[test]
    fn limit_zero_becomes_empty() {
        let plan = LogicalPlan::Row {
            fields: vec![LogicalExpr::integer(1).alias("a", 1)],
        }
        .limit(0);
        assert_eq!(
            propagate_empty().apply(plan),
            LogicalPlan::Empty { attributes: vec![Attribute::new("a", DataType::Integer)] }
        );
    }

    #[test]
    fn grouped_aggregate_over_empty_is_empty() {
        let plan = LogicalPlan::Empty { attributes: vec![] }.aggregate(
            vec![LogicalExpr::call("count", vec![]).alias("count()", 1)],
            vec![LogicalExpr::field("host")],
        );
        let rewritten = aggregate_over_empty().apply(plan);
        let LogicalPlan::Empty { attributes } = rewritten else { panic!("expected Empty") };
        let names: Vec<_> = attributes.into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["count()", "host"]);
    }

    #[test]
    fn global_aggregate_over_empty_produces_defaults() {
        let plan = LogicalPlan::Empty { attributes: vec![] }.aggregate(
            vec![
                LogicalExpr::call("count", vec![]).alias("total", 1),
                LogicalExpr::call("count", vec![LogicalExpr::field("bytes")]).alias("present", 2),
                LogicalExpr::call("sum", vec![LogicalExpr::typed_field("bytes", DataType::Integer)])
                    .alias("sum", 3),
            ],
            vec![],
        );
        let rewritten = aggregate_over_empty().apply(plan);
        assert_eq!(
            rewritten,
            LogicalPlan::Row {
                fields: vec![
                    LogicalExpr::integer(0).alias("total", 1),
                    LogicalExpr::null(DataType::Integer).alias("present", 2),
                    LogicalExpr::null(DataType::Integer).alias("sum", 3),
                ],
            }
        );
    }

    #[test]
    fn scalar_wrappers_fold_after_substitution() {
        let plan = LogicalPlan::Empty { attributes: vec![] }.aggregate(
            vec![LogicalExpr::call("count", vec![])
                .add(LogicalExpr::integer(1))
                .alias("shifted", 1)],
            vec![],
        );
        let rewritten = aggregate_over_empty().apply(plan);
        let LogicalPlan::Row { fields } = rewritten else { panic!("expected Row") };
        assert_eq!(fields[0], LogicalExpr::integer(1).alias("shifted", 1));
    }
}
