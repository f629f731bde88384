//! Logical plan expressions.
//!
//! A smaller, semantically typed expression tree distilled from the parse
//! AST. Nodes are immutable: every rewrite builds new nodes, so structural
//! equality (`PartialEq`) is what decides whether an optimizer rule changed
//! anything.

use std::fmt;

use crate::ast::{BinaryOp, UnaryOp};

use super::functions;

/// Data types known to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Boolean.
    Boolean,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Double,
    /// UTF-8 text.
    Text,
    /// The type of a bare `null` literal.
    Null,
    /// Not yet known (fields from sources without schema information).
    Unknown,
}

impl DataType {
    /// Resolves a cast target type name as written in the query.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "boolean" | "bool" => Some(Self::Boolean),
            "integer" | "int" | "long" => Some(Self::Integer),
            "double" | "float" => Some(Self::Double),
            "string" | "text" | "keyword" => Some(Self::Text),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Text => "string",
            Self::Null => "null",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// A constant value.
///
/// Nulls are typed so that substituting a missing field with a null keeps
/// the column's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A null of the given type.
    Null(DataType),
    /// A boolean.
    Boolean(bool),
    /// An integer.
    Integer(i64),
    /// A double.
    Double(f64),
    /// Text.
    Text(String),
}

impl Value {
    /// The value's data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Null(dt) => *dt,
            Self::Boolean(_) => DataType::Boolean,
            Self::Integer(_) => DataType::Integer,
            Self::Double(_) => DataType::Double,
            Self::Text(_) => DataType::Text,
        }
    }

    /// True for any null, regardless of its type.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(_) => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// A logical plan expression.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalExpr {
    /// A constant.
    Literal(Value),
    /// A reference to a column of the input.
    FieldRef {
        /// Dotted field name.
        name: String,
        /// Known type, or [`DataType::Unknown`] for schemaless sources.
        data_type: DataType,
        /// Whether the reference has been bound to a known attribute or
        /// deferred to the external source.
        resolved: bool,
    },
    /// A call to a registered function, name lowercased.
    Call {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<LogicalExpr>,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<LogicalExpr>,
        /// Right operand.
        right: Box<LogicalExpr>,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<LogicalExpr>,
    },
    /// A cast to a planner type.
    Cast {
        /// The operand.
        expr: Box<LogicalExpr>,
        /// Target type.
        data_type: DataType,
    },
    /// A named output column.
    Alias {
        /// Output name.
        name: String,
        /// Identity of the alias, unique within a plan.
        id: u32,
        /// The aliased expression.
        expr: Box<LogicalExpr>,
    },
    /// `expr IS [NOT] NULL`.
    IsNull {
        /// The tested expression.
        expr: Box<LogicalExpr>,
        /// True for the negated form.
        negated: bool,
    },
    /// Membership test.
    In {
        /// The tested expression.
        expr: Box<LogicalExpr>,
        /// Candidate values.
        list: Vec<LogicalExpr>,
        /// True for `NOT IN`.
        negated: bool,
        /// True for the `in~` variant.
        case_insensitive: bool,
    },
    /// Pattern match.
    Like {
        /// The tested expression.
        expr: Box<LogicalExpr>,
        /// The pattern.
        pattern: String,
        /// True for the negated form.
        negated: bool,
        /// True for the `~` variant.
        case_insensitive: bool,
        /// True for regular-expression matching (`RLIKE`).
        regex: bool,
    },
}

impl LogicalExpr {
    // ========== Constructors ==========

    /// A literal expression.
    #[must_use]
    pub const fn literal(value: Value) -> Self {
        Self::Literal(value)
    }

    /// An integer literal.
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::Literal(Value::Integer(value))
    }

    /// A boolean literal.
    #[must_use]
    pub const fn boolean(value: bool) -> Self {
        Self::Literal(Value::Boolean(value))
    }

    /// A text literal.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Literal(Value::Text(value.into()))
    }

    /// A typed null literal.
    #[must_use]
    pub const fn null(data_type: DataType) -> Self {
        Self::Literal(Value::Null(data_type))
    }

    /// A field reference that has not been bound to a known attribute yet.
    ///
    /// The plan builder upgrades these to resolved, typed references
    /// whenever an attribute flowing up from the input supplies the name;
    /// references left unresolved are deferred to the external source.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::FieldRef { name: name.into(), data_type: DataType::Unknown, resolved: false }
    }

    /// A field reference bound to an attribute of a known type.
    #[must_use]
    pub fn typed_field(name: impl Into<String>, data_type: DataType) -> Self {
        Self::FieldRef { name: name.into(), data_type, resolved: true }
    }

    /// A function call; the name is lowercased.
    #[must_use]
    pub fn call(name: impl Into<String>, args: Vec<LogicalExpr>) -> Self {
        Self::Call { name: name.into().to_ascii_lowercase(), args }
    }

    /// An alias wrapping this expression.
    #[must_use]
    pub fn alias(self, name: impl Into<String>, id: u32) -> Self {
        Self::Alias { name: name.into(), id, expr: Box::new(self) }
    }

    // ========== Builder sugar ==========

    /// `self == other`.
    #[must_use]
    pub fn eq(self, other: LogicalExpr) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    /// `self > other`.
    #[must_use]
    pub fn gt(self, other: LogicalExpr) -> Self {
        self.binary(BinaryOp::Gt, other)
    }

    /// `self < other`.
    #[must_use]
    pub fn lt(self, other: LogicalExpr) -> Self {
        self.binary(BinaryOp::Lt, other)
    }

    /// `self AND other`.
    #[must_use]
    pub fn and(self, other: LogicalExpr) -> Self {
        self.binary(BinaryOp::And, other)
    }

    /// `self OR other`.
    #[must_use]
    pub fn or(self, other: LogicalExpr) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    /// `self + other`.
    #[must_use]
    pub fn add(self, other: LogicalExpr) -> Self {
        self.binary(BinaryOp::Add, other)
    }

    /// `self * other`.
    #[must_use]
    pub fn mul(self, other: LogicalExpr) -> Self {
        self.binary(BinaryOp::Mul, other)
    }

    fn binary(self, op: BinaryOp, other: LogicalExpr) -> Self {
        Self::Binary { op, left: Box::new(self), right: Box::new(other) }
    }

    // ========== Introspection ==========

    /// The column name this expression produces.
    #[must_use]
    pub fn output_name(&self) -> String {
        match self {
            Self::Alias { name, .. } => name.clone(),
            Self::FieldRef { name, .. } => name.clone(),
            other => other.to_string(),
        }
    }

    /// The expression's data type, [`DataType::Unknown`] when undecidable.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Literal(v) => v.data_type(),
            Self::FieldRef { data_type, .. } | Self::Cast { data_type, .. } => *data_type,
            Self::Call { name, args } => functions::return_type(name, args),
            Self::Binary { op, left, right } => {
                if op.is_comparison() || matches!(op, BinaryOp::And | BinaryOp::Or) {
                    DataType::Boolean
                } else {
                    match (left.data_type(), right.data_type()) {
                        (DataType::Double, _) | (_, DataType::Double) => DataType::Double,
                        (DataType::Integer, DataType::Integer) => DataType::Integer,
                        _ => DataType::Unknown,
                    }
                }
            }
            Self::Unary { op: UnaryOp::Not, .. } => DataType::Boolean,
            Self::Unary { operand, .. } => operand.data_type(),
            Self::Alias { expr, .. } => expr.data_type(),
            Self::IsNull { .. } | Self::In { .. } | Self::Like { .. } => DataType::Boolean,
        }
    }

    /// True when this expression is marked resolved, recursively.
    #[must_use]
    pub fn resolved(&self) -> bool {
        match self {
            Self::FieldRef { resolved, .. } => *resolved,
            other => other.children().iter().all(|c| c.resolved()),
        }
    }

    /// Immediate child expressions.
    #[must_use]
    pub fn children(&self) -> Vec<&LogicalExpr> {
        match self {
            Self::Literal(_) | Self::FieldRef { .. } => vec![],
            Self::Call { args, .. } => args.iter().collect(),
            Self::Binary { left, right, .. } => vec![left, right],
            Self::Unary { operand, .. } => vec![operand],
            Self::Cast { expr, .. }
            | Self::Alias { expr, .. }
            | Self::IsNull { expr, .. }
            | Self::Like { expr, .. } => vec![expr],
            Self::In { expr, list, .. } => {
                let mut children = vec![expr.as_ref()];
                children.extend(list.iter());
                children
            }
        }
    }

    /// Collects the names of all referenced fields into `out`.
    pub fn collect_field_names(&self, out: &mut Vec<String>) {
        if let Self::FieldRef { name, .. } = self {
            out.push(name.clone());
        }
        for child in self.children() {
            child.collect_field_names(out);
        }
    }

    /// Bottom-up rewrite: children first, then the (rebuilt) node itself.
    #[must_use]
    pub fn transform_up<F>(self, f: &F) -> LogicalExpr
    where
        F: Fn(LogicalExpr) -> LogicalExpr,
    {
        let rebuilt = match self {
            leaf @ (Self::Literal(_) | Self::FieldRef { .. }) => leaf,
            Self::Call { name, args } => Self::Call {
                name,
                args: args.into_iter().map(|a| a.transform_up(f)).collect(),
            },
            Self::Binary { op, left, right } => Self::Binary {
                op,
                left: Box::new(left.transform_up(f)),
                right: Box::new(right.transform_up(f)),
            },
            Self::Unary { op, operand } => {
                Self::Unary { op, operand: Box::new(operand.transform_up(f)) }
            }
            Self::Cast { expr, data_type } => {
                Self::Cast { expr: Box::new(expr.transform_up(f)), data_type }
            }
            Self::Alias { name, id, expr } => {
                Self::Alias { name, id, expr: Box::new(expr.transform_up(f)) }
            }
            Self::IsNull { expr, negated } => {
                Self::IsNull { expr: Box::new(expr.transform_up(f)), negated }
            }
            Self::In { expr, list, negated, case_insensitive } => Self::In {
                expr: Box::new(expr.transform_up(f)),
                list: list.into_iter().map(|e| e.transform_up(f)).collect(),
                negated,
                case_insensitive,
            },
            Self::Like { expr, pattern, negated, case_insensitive, regex } => Self::Like {
                expr: Box::new(expr.transform_up(f)),
                pattern,
                negated,
                case_insensitive,
                regex,
            },
        };
        f(rebuilt)
    }

    // ========== Constant evaluation ==========

    /// Evaluates the expression to a constant, if it is one.
    ///
    /// Conservative: anything involving a field, a function call or an
    /// operation whose semantics the planner does not model returns `None`.
    #[must_use]
    pub fn fold(&self) -> Option<Value> {
        match self {
            Self::Literal(v) => Some(v.clone()),
            Self::Alias { expr, .. } => expr.fold(),
            Self::Unary { op, operand } => fold_unary(*op, &operand.fold()?),
            Self::Binary { op, left, right } => fold_binary(*op, &left.fold()?, &right.fold()?),
            Self::Cast { expr, data_type } => fold_cast(&expr.fold()?, *data_type),
            Self::IsNull { expr, negated } => {
                let value = expr.fold()?;
                Some(Value::Boolean(value.is_null() != *negated))
            }
            Self::In { expr, list, negated, case_insensitive } => {
                let needle = expr.fold()?;
                if needle.is_null() {
                    return Some(Value::Null(DataType::Boolean));
                }
                let mut found = false;
                for candidate in list {
                    let value = candidate.fold()?;
                    if values_equal(&needle, &value, *case_insensitive) {
                        found = true;
                        break;
                    }
                }
                Some(Value::Boolean(found != *negated))
            }
            Self::FieldRef { .. } | Self::Call { .. } | Self::Like { .. } => None,
        }
    }

    /// True when [`LogicalExpr::fold`] would produce a constant.
    #[must_use]
    pub fn foldable(&self) -> bool {
        self.fold().is_some()
    }
}

fn fold_unary(op: UnaryOp, value: &Value) -> Option<Value> {
    match (op, value) {
        (UnaryOp::Not, Value::Boolean(b)) => Some(Value::Boolean(!b)),
        (UnaryOp::Not, Value::Null(_)) => Some(Value::Null(DataType::Boolean)),
        (UnaryOp::Minus, Value::Integer(i)) => i.checked_neg().map(Value::Integer),
        (UnaryOp::Minus, Value::Double(d)) => Some(Value::Double(-d)),
        (UnaryOp::Plus, v @ (Value::Integer(_) | Value::Double(_))) => Some(v.clone()),
        (UnaryOp::Minus | UnaryOp::Plus, Value::Null(dt)) => Some(Value::Null(*dt)),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn numeric_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    let as_f64 = |v: &Value| match v {
        Value::Integer(i) => Some(*i as f64),
        Value::Double(d) => Some(*d),
        _ => None,
    };
    Some((as_f64(left)?, as_f64(right)?))
}

fn fold_binary(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    use BinaryOp as Op;

    // Three-valued logic short circuits before null propagation.
    if matches!(op, Op::And | Op::Or) {
        return fold_logical(op, left, right);
    }
    if left.is_null() || right.is_null() {
        let dt = if op.is_comparison() {
            DataType::Boolean
        } else {
            match (left.data_type(), right.data_type()) {
                (DataType::Double, _) | (_, DataType::Double) => DataType::Double,
                _ => DataType::Integer,
            }
        };
        return Some(Value::Null(dt));
    }

    match op {
        Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => fold_arithmetic(op, left, right),
        Op::Eq => Some(Value::Boolean(values_equal(left, right, false))),
        Op::NotEq => Some(Value::Boolean(!values_equal(left, right, false))),
        Op::Lt | Op::LtEq | Op::Gt | Op::GtEq => {
            let ordering = compare_values(left, right)?;
            let result = match op {
                Op::Lt => ordering.is_lt(),
                Op::LtEq => ordering.is_le(),
                Op::Gt => ordering.is_gt(),
                Op::GtEq => ordering.is_ge(),
                _ => unreachable!(),
            };
            Some(Value::Boolean(result))
        }
        Op::And | Op::Or => unreachable!(),
    }
}

fn fold_logical(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    let as_bool = |v: &Value| match v {
        Value::Boolean(b) => Some(Some(*b)),
        Value::Null(_) => Some(None),
        _ => None,
    };
    let (l, r) = (as_bool(left)?, as_bool(right)?);
    let result = match op {
        BinaryOp::And => match (l, r) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        BinaryOp::Or => match (l, r) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        _ => unreachable!(),
    };
    Some(result.map_or(Value::Null(DataType::Boolean), Value::Boolean))
}

fn fold_arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    use BinaryOp as Op;

    if let (Value::Integer(l), Value::Integer(r)) = (left, right) {
        return match op {
            Op::Add => l.checked_add(*r).map(Value::Integer),
            Op::Sub => l.checked_sub(*r).map(Value::Integer),
            Op::Mul => l.checked_mul(*r).map(Value::Integer),
            // Division by zero is a runtime error, not a foldable constant.
            Op::Div => l.checked_div(*r).map(Value::Integer),
            Op::Mod => l.checked_rem(*r).map(Value::Integer),
            _ => None,
        };
    }
    let (l, r) = numeric_pair(left, right)?;
    let result = match op {
        Op::Add => l + r,
        Op::Sub => l - r,
        Op::Mul => l * r,
        Op::Div => l / r,
        Op::Mod => l % r,
        _ => return None,
    };
    Some(Value::Double(result))
}

fn values_equal(left: &Value, right: &Value, case_insensitive: bool) -> bool {
    match (left, right) {
        (Value::Text(l), Value::Text(r)) if case_insensitive => l.eq_ignore_ascii_case(r),
        _ => compare_values(left, right).is_some_and(std::cmp::Ordering::is_eq),
    }
}

#[allow(clippy::cast_precision_loss)]
fn compare_values(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => Some(l.cmp(r)),
        (Value::Text(l), Value::Text(r)) => Some(l.cmp(r)),
        (Value::Boolean(l), Value::Boolean(r)) => Some(l.cmp(r)),
        (Value::Double(_) | Value::Integer(_), Value::Double(_) | Value::Integer(_)) => {
            let as_f64 = |v: &Value| match v {
                Value::Integer(i) => *i as f64,
                Value::Double(d) => *d,
                _ => unreachable!(),
            };
            as_f64(left).partial_cmp(&as_f64(right))
        }
        _ => None,
    }
}

fn fold_cast(value: &Value, target: DataType) -> Option<Value> {
    if value.data_type() == target {
        return Some(value.clone());
    }
    match (value, target) {
        (Value::Null(_), _) => Some(Value::Null(target)),
        #[allow(clippy::cast_precision_loss)]
        (Value::Integer(i), DataType::Double) => Some(Value::Double(*i as f64)),
        (Value::Integer(i), DataType::Text) => Some(Value::Text(i.to_string())),
        (Value::Double(d), DataType::Text) => Some(Value::Text(d.to_string())),
        (Value::Boolean(b), DataType::Text) => Some(Value::Text(b.to_string())),
        (Value::Text(s), DataType::Integer) => s.trim().parse().ok().map(Value::Integer),
        (Value::Text(s), DataType::Double) => s.trim().parse().ok().map(Value::Double),
        (Value::Text(s), DataType::Boolean) => match s.trim() {
            "true" => Some(Value::Boolean(true)),
            "false" => Some(Value::Boolean(false)),
            _ => None,
        },
        _ => None,
    }
}

/// One sort key of an `OrderBy` or `TopN` node.
#[derive(Debug, Clone, PartialEq)]
pub struct SortOrder {
    /// The sort expression.
    pub expr: LogicalExpr,
    /// True for ascending order.
    pub ascending: bool,
    /// Whether nulls sort first.
    pub nulls_first: bool,
}

impl SortOrder {
    /// Ascending order; nulls last, matching the language default.
    #[must_use]
    pub const fn asc(expr: LogicalExpr) -> Self {
        Self { expr, ascending: true, nulls_first: false }
    }

    /// Descending order; nulls first.
    #[must_use]
    pub const fn desc(expr: LogicalExpr) -> Self {
        Self { expr, ascending: false, nulls_first: true }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}",
            self.expr,
            if self.ascending { "asc" } else { "desc" },
            if self.nulls_first { " nulls first" } else { "" }
        )
    }
}

impl fmt::Display for LogicalExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{v}"),
            Self::FieldRef { name, .. } => write!(f, "{name}"),
            Self::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::Unary { op, operand } => write!(f, "({op} {operand})"),
            Self::Cast { expr, data_type } => write!(f, "{expr}::{data_type}"),
            Self::Alias { name, expr, .. } => write!(f, "{expr} as {name}"),
            Self::IsNull { expr, negated } => {
                write!(f, "{expr} is {}null", if *negated { "not " } else { "" })
            }
            Self::In { expr, list, negated, case_insensitive } => {
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
            Self::Like { expr, pattern, negated, case_insensitive, regex } => {
                let base = if *regex { "rlike" } else { "like" };
                let tilde = if *case_insensitive { "~" } else { "" };
                write!(f, "{expr} {}{base}{tilde} \"{pattern}\"", if *negated { "not " } else { "" })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_arithmetic_constants() {
        let expr = LogicalExpr::integer(2).add(LogicalExpr::integer(3)).mul(LogicalExpr::integer(4));
        assert_eq!(expr.fold(), Some(Value::Integer(20)));
    }

    #[test]
    fn fold_division_by_zero_is_not_a_constant() {
        let expr = LogicalExpr::Binary {
            op: crate::ast::BinaryOp::Div,
            left: Box::new(LogicalExpr::integer(1)),
            right: Box::new(LogicalExpr::integer(0)),
        };
        assert_eq!(expr.fold(), None);
    }

    #[test]
    fn fold_three_valued_logic() {
        let null = LogicalExpr::null(DataType::Boolean);
        assert_eq!(
            LogicalExpr::boolean(false).and(null.clone()).fold(),
            Some(Value::Boolean(false))
        );
        assert_eq!(LogicalExpr::boolean(true).or(null.clone()).fold(), Some(Value::Boolean(true)));
        assert_eq!(
            LogicalExpr::boolean(true).and(null).fold(),
            Some(Value::Null(DataType::Boolean))
        );
    }

    #[test]
    fn fold_comparison_with_null_is_null() {
        let expr = LogicalExpr::null(DataType::Integer).eq(LogicalExpr::integer(1));
        assert_eq!(expr.fold(), Some(Value::Null(DataType::Boolean)));
    }

    #[test]
    fn fold_is_null() {
        let expr = LogicalExpr::IsNull {
            expr: Box::new(LogicalExpr::null(DataType::Text)),
            negated: false,
        };
        assert_eq!(expr.fold(), Some(Value::Boolean(true)));
    }

    #[test]
    fn fold_cast_string_to_integer() {
        let expr = LogicalExpr::Cast {
            expr: Box::new(LogicalExpr::text("42")),
            data_type: DataType::Integer,
        };
        assert_eq!(expr.fold(), Some(Value::Integer(42)));
    }

    #[test]
    fn fold_in_list() {
        let expr = LogicalExpr::In {
            expr: Box::new(LogicalExpr::text("A")),
            list: vec![LogicalExpr::text("a"), LogicalExpr::text("b")],
            negated: false,
            case_insensitive: true,
        };
        assert_eq!(expr.fold(), Some(Value::Boolean(true)));
    }

    #[test]
    fn fields_are_not_foldable() {
        let expr = LogicalExpr::field("status").eq(LogicalExpr::integer(200));
        assert!(!expr.foldable());
    }

    #[test]
    fn output_name_prefers_alias() {
        let expr = LogicalExpr::call("count", vec![]).alias("total", 1);
        assert_eq!(expr.output_name(), "total");
        assert_eq!(LogicalExpr::field("host").output_name(), "host");
    }

    #[test]
    fn transform_up_rewrites_bottom_up() {
        let expr = LogicalExpr::integer(1).add(LogicalExpr::integer(2));
        let rewritten = expr.transform_up(&|e| {
            if let Some(v) = e.fold() {
                LogicalExpr::Literal(v)
            } else {
                e
            }
        });
        assert_eq!(rewritten, LogicalExpr::integer(3));
    }

    #[test]
    fn typed_null_keeps_type() {
        assert_eq!(LogicalExpr::null(DataType::Text).data_type(), DataType::Text);
    }

    #[test]
    fn collect_field_names_walks_tree() {
        let expr = LogicalExpr::field("a").add(LogicalExpr::field("b").mul(LogicalExpr::integer(2)));
        let mut names = Vec::new();
        expr.collect_field_names(&mut names);
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
