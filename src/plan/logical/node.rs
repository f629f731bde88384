//! Logical plan nodes.
//!
//! Plans form a tree of immutable nodes with single inputs (the pipeline
//! shape of the language has no true binary operators; `JOIN` is modeled
//! as a unary lookup against a named index). Rewrites run through
//! [`LogicalPlan::transform_up`] and compare with `PartialEq` to detect
//! fixpoints.

use std::fmt;

use super::expr::{DataType, LogicalExpr, SortOrder};

/// A named, typed output column of a plan node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Column name.
    pub name: String,
    /// Column type, [`DataType::Unknown`] for schemaless sources.
    pub data_type: DataType,
}

impl Attribute {
    /// Creates an attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self { name: name.into(), data_type }
    }
}

/// A logical query plan node.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalPlan {
    /// A scan of one or more named indices.
    Relation {
        /// Index names, in query order.
        indices: Vec<String>,
        /// Declared columns; empty for schemaless (open) sources.
        attributes: Vec<Attribute>,
    },
    /// An inline single-row source built from constant expressions.
    Row {
        /// Aliased constant expressions.
        fields: Vec<LogicalExpr>,
    },
    /// A source that is known to produce zero rows but keeps its schema.
    Empty {
        /// Output columns of the plan this node replaced.
        attributes: Vec<Attribute>,
    },
    /// Deployment metadata listing.
    Show,
    /// Row filter.
    Filter {
        /// Boolean predicate.
        predicate: LogicalExpr,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Column computation; each field is an aliased expression appended to
    /// (or replacing a same-named column of) the input.
    Eval {
        /// Aliased expressions.
        fields: Vec<LogicalExpr>,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Grouped aggregation.
    Aggregate {
        /// Aliased aggregate expressions.
        aggregates: Vec<LogicalExpr>,
        /// Grouping expressions.
        groupings: Vec<LogicalExpr>,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Column removal; output is the input minus `fields`.
    Drop {
        /// Field references to remove.
        fields: Vec<LogicalExpr>,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Column projection; output is exactly `fields`, in order.
    Project {
        /// Field references or aliases.
        fields: Vec<LogicalExpr>,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Sort.
    OrderBy {
        /// Sort keys, most significant first.
        keys: Vec<SortOrder>,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Row count cap.
    Limit {
        /// Maximum number of rows.
        count: i64,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Fused sort-and-limit. The logical optimizer splits this back into
    /// a `Limit` over an `OrderBy` so later passes see one canonical shape.
    TopN {
        /// Sort keys.
        keys: Vec<SortOrder>,
        /// Maximum number of rows.
        count: i64,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Pattern-based field extraction with `DISSECT` semantics.
    Dissect {
        /// Source field.
        field: LogicalExpr,
        /// Dissect pattern.
        pattern: String,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Pattern-based field extraction with `GROK` semantics.
    Grok {
        /// Source field.
        field: LogicalExpr,
        /// Grok pattern.
        pattern: String,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Multivalue expansion: one output row per element of `field`.
    MvExpand {
        /// Expanded field.
        field: LogicalExpr,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Enrichment against a named policy.
    Enrich {
        /// Policy name.
        policy: String,
        /// Match field, defaults to the policy's match field when absent.
        on: Option<LogicalExpr>,
        /// Fields appended from the policy, empty means all.
        with: Vec<LogicalExpr>,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
    /// Dev-gated lookup join against a named index.
    Join {
        /// Join index name.
        index: String,
        /// Join key fields.
        on: Vec<LogicalExpr>,
        /// Input plan.
        input: Box<LogicalPlan>,
    },
}

impl LogicalPlan {
    // ========== Builders ==========

    /// A schemaless relation scan.
    #[must_use]
    pub fn relation(indices: Vec<String>) -> Self {
        Self::Relation { indices, attributes: vec![] }
    }

    /// Wraps this plan in a filter.
    #[must_use]
    pub fn filter(self, predicate: LogicalExpr) -> Self {
        Self::Filter { predicate, input: Box::new(self) }
    }

    /// Wraps this plan in an eval.
    #[must_use]
    pub fn eval(self, fields: Vec<LogicalExpr>) -> Self {
        Self::Eval { fields, input: Box::new(self) }
    }

    /// Wraps this plan in an aggregation.
    #[must_use]
    pub fn aggregate(self, aggregates: Vec<LogicalExpr>, groupings: Vec<LogicalExpr>) -> Self {
        Self::Aggregate { aggregates, groupings, input: Box::new(self) }
    }

    /// Wraps this plan in a projection.
    #[must_use]
    pub fn project(self, fields: Vec<LogicalExpr>) -> Self {
        Self::Project { fields, input: Box::new(self) }
    }

    /// Wraps this plan in a sort.
    #[must_use]
    pub fn order_by(self, keys: Vec<SortOrder>) -> Self {
        Self::OrderBy { keys, input: Box::new(self) }
    }

    /// Wraps this plan in a limit.
    #[must_use]
    pub fn limit(self, count: i64) -> Self {
        Self::Limit { count, input: Box::new(self) }
    }

    // ========== Introspection ==========

    /// A short name for the node variant, used in plan displays.
    #[must_use]
    pub const fn node_type(&self) -> &'static str {
        match self {
            Self::Relation { .. } => "Relation",
            Self::Row { .. } => "Row",
            Self::Empty { .. } => "Empty",
            Self::Show => "Show",
            Self::Filter { .. } => "Filter",
            Self::Eval { .. } => "Eval",
            Self::Aggregate { .. } => "Aggregate",
            Self::Drop { .. } => "Drop",
            Self::Project { .. } => "Project",
            Self::OrderBy { .. } => "OrderBy",
            Self::Limit { .. } => "Limit",
            Self::TopN { .. } => "TopN",
            Self::Dissect { .. } => "Dissect",
            Self::Grok { .. } => "Grok",
            Self::MvExpand { .. } => "MvExpand",
            Self::Enrich { .. } => "Enrich",
            Self::Join { .. } => "Join",
        }
    }

    /// Immediate child plans.
    #[must_use]
    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            Self::Relation { .. } | Self::Row { .. } | Self::Empty { .. } | Self::Show => vec![],
            Self::Filter { input, .. }
            | Self::Eval { input, .. }
            | Self::Aggregate { input, .. }
            | Self::Drop { input, .. }
            | Self::Project { input, .. }
            | Self::OrderBy { input, .. }
            | Self::Limit { input, .. }
            | Self::TopN { input, .. }
            | Self::Dissect { input, .. }
            | Self::Grok { input, .. }
            | Self::MvExpand { input, .. }
            | Self::Enrich { input, .. }
            | Self::Join { input, .. } => vec![input],
        }
    }

    /// The expressions held by this node itself (not its children).
    #[must_use]
    pub fn expressions(&self) -> Vec<&LogicalExpr> {
        match self {
            Self::Relation { .. } | Self::Empty { .. } | Self::Show | Self::Limit { .. } => vec![],
            Self::Row { fields }
            | Self::Eval { fields, .. }
            | Self::Drop { fields, .. }
            | Self::Project { fields, .. } => fields.iter().collect(),
            Self::Filter { predicate, .. } => vec![predicate],
            Self::Aggregate { aggregates, groupings, .. } => {
                aggregates.iter().chain(groupings.iter()).collect()
            }
            Self::OrderBy { keys, .. } | Self::TopN { keys, .. } => {
                keys.iter().map(|k| &k.expr).collect()
            }
            Self::Dissect { field, .. } | Self::Grok { field, .. } | Self::MvExpand { field, .. } => {
                vec![field]
            }
            Self::Enrich { on, with, .. } => on.iter().chain(with.iter()).collect(),
            Self::Join { on, .. } => on.iter().collect(),
        }
    }

    /// The output columns of this node, best effort.
    ///
    /// A schemaless relation contributes nothing, so field references over
    /// it stay unresolved; shape-preserving operators pass their input
    /// through.
    #[must_use]
    pub fn output_attributes(&self) -> Vec<Attribute> {
        match self {
            Self::Show => vec![],
            Self::Relation { attributes, .. } | Self::Empty { attributes } => attributes.clone(),
            Self::Row { fields } | Self::Project { fields, .. } => fields
                .iter()
                .map(|f| Attribute::new(f.output_name(), f.data_type()))
                .collect(),
            Self::Aggregate { aggregates, groupings, .. } => aggregates
                .iter()
                .chain(groupings.iter())
                .map(|e| Attribute::new(e.output_name(), e.data_type()))
                .collect(),
            Self::Eval { fields, input } => {
                let mut attrs = input.output_attributes();
                for field in fields {
                    let attr = Attribute::new(field.output_name(), field.data_type());
                    if let Some(existing) = attrs.iter_mut().find(|a| a.name == attr.name) {
                        *existing = attr;
                    } else {
                        attrs.push(attr);
                    }
                }
                attrs
            }
            Self::Drop { fields, input } => {
                let dropped: Vec<_> = fields.iter().map(LogicalExpr::output_name).collect();
                input
                    .output_attributes()
                    .into_iter()
                    .filter(|a| !dropped.contains(&a.name))
                    .collect()
            }
            Self::Filter { input, .. }
            | Self::OrderBy { input, .. }
            | Self::Limit { input, .. }
            | Self::TopN { input, .. }
            | Self::Dissect { input, .. }
            | Self::Grok { input, .. }
            | Self::MvExpand { input, .. } => input.output_attributes(),
            Self::Enrich { with, input, .. } => {
                let mut attrs = input.output_attributes();
                attrs.extend(
                    with.iter().map(|f| Attribute::new(f.output_name(), DataType::Unknown)),
                );
                attrs
            }
            Self::Join { input, .. } => input.output_attributes(),
        }
    }

    /// An [`LogicalPlan::Empty`] node carrying this plan's output schema.
    #[must_use]
    pub fn as_empty(&self) -> LogicalPlan {
        Self::Empty { attributes: self.output_attributes() }
    }

    // ========== Rewriting ==========

    /// Rebuilds the node with each immediate child replaced by `f(child)`.
    #[must_use]
    pub fn map_children<F>(self, mut f: F) -> LogicalPlan
    where
        F: FnMut(LogicalPlan) -> LogicalPlan,
    {
        let mut remap = |input: Box<LogicalPlan>| Box::new(f(*input));
        match self {
            leaf @ (Self::Relation { .. } | Self::Row { .. } | Self::Empty { .. } | Self::Show) => {
                leaf
            }
            Self::Filter { predicate, input } => {
                Self::Filter { predicate, input: remap(input) }
            }
            Self::Eval { fields, input } => Self::Eval { fields, input: remap(input) },
            Self::Aggregate { aggregates, groupings, input } => {
                Self::Aggregate { aggregates, groupings, input: remap(input) }
            }
            Self::Drop { fields, input } => Self::Drop { fields, input: remap(input) },
            Self::Project { fields, input } => Self::Project { fields, input: remap(input) },
            Self::OrderBy { keys, input } => Self::OrderBy { keys, input: remap(input) },
            Self::Limit { count, input } => Self::Limit { count, input: remap(input) },
            Self::TopN { keys, count, input } => Self::TopN { keys, count, input: remap(input) },
            Self::Dissect { field, pattern, input } => {
                Self::Dissect { field, pattern, input: remap(input) }
            }
            Self::Grok { field, pattern, input } => {
                Self::Grok { field, pattern, input: remap(input) }
            }
            Self::MvExpand { field, input } => Self::MvExpand { field, input: remap(input) },
            Self::Enrich { policy, on, with, input } => {
                Self::Enrich { policy, on, with, input: remap(input) }
            }
            Self::Join { index, on, input } => Self::Join { index, on, input: remap(input) },
        }
    }

    /// Bottom-up plan rewrite: children first, then the rebuilt node.
    #[must_use]
    pub fn transform_up<F>(self, f: &F) -> LogicalPlan
    where
        F: Fn(LogicalPlan) -> LogicalPlan,
    {
        let rebuilt = self.map_children(|child| child.transform_up(f));
        f(rebuilt)
    }

    /// Rewrites every expression held by this node (not its children).
    #[must_use]
    pub fn map_expressions<F>(self, f: &F) -> LogicalPlan
    where
        F: Fn(LogicalExpr) -> LogicalExpr,
    {
        match self {
            plan @ (Self::Relation { .. }
            | Self::Empty { .. }
            | Self::Show
            | Self::Limit { .. }) => plan,
            Self::Row { fields } => Self::Row { fields: fields.into_iter().map(f).collect() },
            Self::Eval { fields, input } => {
                Self::Eval { fields: fields.into_iter().map(f).collect(), input }
            }
            Self::Drop { fields, input } => {
                Self::Drop { fields: fields.into_iter().map(f).collect(), input }
            }
            Self::Project { fields, input } => {
                Self::Project { fields: fields.into_iter().map(f).collect(), input }
            }
            Self::Filter { predicate, input } => Self::Filter { predicate: f(predicate), input },
            Self::Aggregate { aggregates, groupings, input } => Self::Aggregate {
                aggregates: aggregates.into_iter().map(f).collect(),
                groupings: groupings.into_iter().map(f).collect(),
                input,
            },
            Self::OrderBy { keys, input } => Self::OrderBy {
                keys: keys
                    .into_iter()
                    .map(|k| SortOrder { expr: f(k.expr), ..k })
                    .collect(),
                input,
            },
            Self::TopN { keys, count, input } => Self::TopN {
                keys: keys
                    .into_iter()
                    .map(|k| SortOrder { expr: f(k.expr), ..k })
                    .collect(),
                count,
                input,
            },
            Self::Dissect { field, pattern, input } => {
                Self::Dissect { field: f(field), pattern, input }
            }
            Self::Grok { field, pattern, input } => Self::Grok { field: f(field), pattern, input },
            Self::MvExpand { field, input } => Self::MvExpand { field: f(field), input },
            Self::Enrich { policy, on, with, input } => Self::Enrich {
                policy,
                on: on.map(f),
                with: with.into_iter().map(f).collect(),
                input,
            },
            Self::Join { index, on, input } => {
                Self::Join { index, on: on.into_iter().map(f).collect(), input }
            }
        }
    }

    /// Renders the plan as an indented tree, one node per line.
    #[must_use]
    pub fn display_tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize) {
        use std::fmt::Write as _;

        for _ in 0..depth {
            out.push_str("  ");
        }
        let _ = writeln!(out, "{self}");
        for child in self.children() {
            child.write_tree(out, depth + 1);
        }
    }
}

fn join_exprs(exprs: &[LogicalExpr]) -> String {
    exprs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relation { indices, .. } => write!(f, "Relation[{}]", indices.join(", ")),
            Self::Row { fields } => write!(f, "Row[{}]", join_exprs(fields)),
            Self::Empty { attributes } => {
                let names: Vec<_> = attributes.iter().map(|a| a.name.as_str()).collect();
                write!(f, "Empty[{}]", names.join(", "))
            }
            Self::Show => write!(f, "Show"),
            Self::Filter { predicate, .. } => write!(f, "Filter[{predicate}]"),
            Self::Eval { fields, .. } => write!(f, "Eval[{}]", join_exprs(fields)),
            Self::Aggregate { aggregates, groupings, .. } => {
                write!(f, "Aggregate[{}", join_exprs(aggregates))?;
                if !groupings.is_empty() {
                    write!(f, " by {}", join_exprs(groupings))?;
                }
                write!(f, "]")
            }
            Self::Drop { fields, .. } => write!(f, "Drop[{}]", join_exprs(fields)),
            Self::Project { fields, .. } => write!(f, "Project[{}]", join_exprs(fields)),
            Self::OrderBy { keys, .. } => {
                let keys: Vec<_> = keys.iter().map(ToString::to_string).collect();
                write!(f, "OrderBy[{}]", keys.join(", "))
            }
            Self::Limit { count, .. } => write!(f, "Limit[{count}]"),
            Self::TopN { keys, count, .. } => {
                let keys: Vec<_> = keys.iter().map(ToString::to_string).collect();
                write!(f, "TopN[{count}, {}]", keys.join(", "))
            }
            Self::Dissect { field, pattern, .. } => write!(f, "Dissect[{field}, \"{pattern}\"]"),
            Self::Grok { field, pattern, .. } => write!(f, "Grok[{field}, \"{pattern}\"]"),
            Self::MvExpand { field, .. } => write!(f, "MvExpand[{field}]"),
            Self::Enrich { policy, on, with, .. } => {
                write!(f, "Enrich[{policy}")?;
                if let Some(on) = on {
                    write!(f, " on {on}")?;
                }
                if !with.is_empty() {
                    write!(f, " with {}", join_exprs(with))?;
                }
                write!(f, "]")
            }
            Self::Join { index, on, .. } => write!(f, "Join[{index} on {}]", join_exprs(on)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> LogicalPlan {
        LogicalPlan::relation(vec!["logs".into()])
            .filter(LogicalExpr::field("status").eq(LogicalExpr::integer(200)))
            .limit(10)
    }

    #[test]
    fn display_tree_indents_children() {
        let rendered = sample_plan().display_tree();
        assert_eq!(
            rendered,
            "Limit[10]\n  Filter[(status == 200)]\n    Relation[logs]\n"
        );
    }

    #[test]
    fn transform_up_visits_leaves_first() {
        let plan = sample_plan();
        // Replace the relation with an empty node; parents stay intact.
        let rewritten = plan.transform_up(&|node| match node {
            LogicalPlan::Relation { .. } => LogicalPlan::Empty { attributes: vec![] },
            other => other,
        });
        assert_eq!(rewritten.display_tree(), "Limit[10]\n  Filter[(status == 200)]\n    Empty[]\n");
    }

    #[test]
    fn relation_exposes_declared_attributes() {
        let schema = vec![Attribute::new("status", DataType::Integer)];
        let plan = LogicalPlan::Relation {
            indices: vec!["logs".into()],
            attributes: schema.clone(),
        };
        assert_eq!(plan.output_attributes(), schema);
        assert!(LogicalPlan::relation(vec!["logs".into()]).output_attributes().is_empty());
    }

    #[test]
    fn eval_replaces_same_named_attribute() {
        let plan = LogicalPlan::Row {
            fields: vec![
                LogicalExpr::integer(1).alias("a", 1),
                LogicalExpr::integer(2).alias("b", 2),
            ],
        }
        .eval(vec![LogicalExpr::text("replaced").alias("a", 3)]);
        let attrs = plan.output_attributes();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0], Attribute::new("a", DataType::Text));
        assert_eq!(attrs[1], Attribute::new("b", DataType::Integer));
    }

    #[test]
    fn aggregate_attributes_list_aggregates_then_groupings() {
        let plan = LogicalPlan::relation(vec!["logs".into()]).aggregate(
            vec![LogicalExpr::call("count", vec![]).alias("count()", 1)],
            vec![LogicalExpr::field("host")],
        );
        let names: Vec<_> = plan.output_attributes().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["count()", "host"]);
    }

    #[test]
    fn map_expressions_only_touches_this_node() {
        let plan = sample_plan();
        let rewritten = plan.map_expressions(&|_| LogicalExpr::boolean(true));
        // Limit holds no expressions, so nothing changes at the top.
        assert_eq!(rewritten, sample_plan());
    }
}
