//! Function registry.
//!
//! The planner recognizes a fixed set of function names. Classification
//! distinguishes names that exist but are not callable in this position
//! (aggregates outside `STATS`, recognized-but-unsupported names) from
//! names that do not exist at all, so error messages can differ.

use super::expr::{DataType, LogicalExpr, Value};

/// Aggregate functions, valid only inside `STATS` aggregates.
pub const AGGREGATE_FUNCTIONS: &[&str] = &[
    "count",
    "count_distinct",
    "sum",
    "min",
    "max",
    "avg",
    "median",
    "percentile",
    "values",
];

/// Scalar functions, valid in any expression position.
pub const SCALAR_FUNCTIONS: &[&str] = &[
    "abs",
    "ceil",
    "floor",
    "round",
    "sqrt",
    "pow",
    "length",
    "concat",
    "substring",
    "starts_with",
    "ends_with",
    "to_lower",
    "to_upper",
    "trim",
    "coalesce",
    "case",
    "greatest",
    "least",
    "to_string",
    "to_integer",
    "to_double",
    "to_boolean",
];

/// Names that are part of the language surface but have no implementation
/// in this planner. They get a dedicated rejection message.
pub const UNSUPPORTED_FUNCTIONS: &[&str] = &["bucket", "date_histogram", "st_centroid"];

/// How a function name classifies against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// A registered aggregate.
    Aggregate,
    /// A registered scalar.
    Scalar,
    /// Recognized but deliberately not implemented.
    Unsupported,
    /// Not a known function name.
    Unknown,
}

/// Classifies a (lowercased) function name.
#[must_use]
pub fn classify(name: &str) -> FunctionKind {
    if AGGREGATE_FUNCTIONS.contains(&name) {
        FunctionKind::Aggregate
    } else if SCALAR_FUNCTIONS.contains(&name) {
        FunctionKind::Scalar
    } else if UNSUPPORTED_FUNCTIONS.contains(&name) {
        FunctionKind::Unsupported
    } else {
        FunctionKind::Unknown
    }
}

/// The return type of a registered function, [`DataType::Unknown`] when it
/// depends on inputs the planner cannot see through.
#[must_use]
pub fn return_type(name: &str, args: &[LogicalExpr]) -> DataType {
    let arg_type = |i: usize| args.get(i).map_or(DataType::Unknown, LogicalExpr::data_type);
    match name {
        "count" | "count_distinct" | "length" | "to_integer" => DataType::Integer,
        "avg" | "median" | "percentile" | "sqrt" | "pow" | "to_double" => DataType::Double,
        "concat" | "substring" | "to_lower" | "to_upper" | "trim" | "to_string" => DataType::Text,
        "starts_with" | "ends_with" | "to_boolean" => DataType::Boolean,
        "sum" | "min" | "max" | "values" | "abs" | "ceil" | "floor" | "round" | "coalesce"
        | "greatest" | "least" => arg_type(0),
        // case(cond, then, ..., else): value arms carry the type.
        "case" => arg_type(1),
        _ => DataType::Unknown,
    }
}

/// The constant an aggregate produces over zero input rows.
///
/// `count` of a never-null argument (or of `*`, represented as no
/// arguments) is zero; every other aggregate, and `count` of a nullable
/// argument, is a typed null.
#[must_use]
pub fn value_over_empty(name: &str, args: &[LogicalExpr]) -> Value {
    if name == "count" || name == "count_distinct" {
        let counts_rows = args.is_empty()
            || args.iter().all(|a| a.fold().is_some_and(|v| !v.is_null()));
        if counts_rows {
            return Value::Integer(0);
        }
        return Value::Null(DataType::Integer);
    }
    Value::Null(return_type(name, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_buckets() {
        assert_eq!(classify("count"), FunctionKind::Aggregate);
        assert_eq!(classify("percentile"), FunctionKind::Aggregate);
        assert_eq!(classify("values"), FunctionKind::Aggregate);
        assert_eq!(classify("concat"), FunctionKind::Scalar);
        assert_eq!(classify("to_integer"), FunctionKind::Scalar);
        assert_eq!(classify("bucket"), FunctionKind::Unsupported);
        assert_eq!(classify("date_histogram"), FunctionKind::Unsupported);
        assert_eq!(classify("frobnicate"), FunctionKind::Unknown);
    }

    #[test]
    fn count_over_empty_is_zero() {
        assert_eq!(value_over_empty("count", &[]), Value::Integer(0));
        assert_eq!(
            value_over_empty("count", &[LogicalExpr::integer(1)]),
            Value::Integer(0)
        );
    }

    #[test]
    fn count_of_field_over_empty_is_null() {
        assert_eq!(
            value_over_empty("count", &[LogicalExpr::field("bytes")]),
            Value::Null(DataType::Integer)
        );
    }

    #[test]
    fn other_aggregates_over_empty_are_typed_nulls() {
        assert_eq!(
            value_over_empty("avg", &[LogicalExpr::field("bytes")]),
            Value::Null(DataType::Double)
        );
        let typed = LogicalExpr::typed_field("bytes", DataType::Integer);
        assert_eq!(value_over_empty("sum", &[typed]), Value::Null(DataType::Integer));
        let host = LogicalExpr::typed_field("host", DataType::Text);
        assert_eq!(value_over_empty("values", &[host]), Value::Null(DataType::Text));
    }

    #[test]
    fn return_types() {
        assert_eq!(return_type("count", &[]), DataType::Integer);
        assert_eq!(return_type("concat", &[]), DataType::Text);
        assert_eq!(
            return_type("min", &[LogicalExpr::typed_field("bytes", DataType::Integer)]),
            DataType::Integer
        );
    }
}
