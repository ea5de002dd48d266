use std::cmp::Ordering;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::error::CompileError;
use crate::value::Value;

/// The filter operator catalogue.
///
/// This enum is the single source of truth shared by both backends: the
/// remote compiler renders each operator through [`Operator::aql_form`] and
/// the in-memory matcher evaluates it through [`Operator::to_predicate`].
/// Both are exhaustive matches in this module, so an operator cannot be
/// added to one backend and forgotten in the other.
///
/// Qualifier parsing is case-insensitive and tolerates a leading `$`
/// (`"age:gte"`, `"age:$GTE"` and `"age:>="` all name the same operator).
/// An unknown operator is a hard error, never a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal (`==`); the default when a qualifier has no suffix
    Eq,
    /// Not equal (`!=`)
    Ne,
    /// Greater than (`>`)
    Gt,
    /// Greater than or equal (`>=`)
    Gte,
    /// Less than (`<`)
    Lt,
    /// Less than or equal (`<=`)
    Lte,

    /// Field value is a member of the operand array
    In,
    /// Field value is not a member of the operand array
    NotIn,

    /// Operand is a member of the field's array value (reverse operand order)
    Includes,
    /// Operand is not a member of the field's array value (reverse operand order)
    NotIncludes,

    /// Field is present and null
    Null,
    /// Field is not a present null
    NotNull,

    /// String prefix match
    StartsWith,
    /// String suffix match
    EndsWith,

    /// Substring match
    Contains,
    /// Negated substring match
    NotContains,

    /// `%`-wildcard pattern match, operand passed through verbatim
    Like,
    /// Negated `%`-wildcard pattern match
    NotLike,

    /// Inclusive range; operand must be a two-element array
    Between,

    /// Field is present (null counts as present)
    Exists,
    /// Field is absent
    NotExists,
}

/// How an operator renders into remote query text.
///
/// The compiler assembles the final clause from these shapes; the per-shape
/// text lives here so the whole remote vocabulary stays in one table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AqlForm {
    /// `field OP operand`
    Infix(&'static str),
    /// `operand OP field` (reverse-operand operators)
    InfixReversed(&'static str),
    /// `field OP null`, no bound operand
    NullCheck(&'static str),
    /// `field LIKE @bind` with the operand wrapped in `%` wildcards
    Pattern {
        keyword: &'static str,
        prefix: &'static str,
        suffix: &'static str,
    },
    /// `field >= @a AND field <= @b`, two bound operands
    Range,
    /// `HAS(alias, "path")`, no bound operand
    Existence { negated: bool },
}

impl Operator {
    /// Parse an operator token.
    ///
    /// Accepts the canonical names, the symbol forms (`=`, `!=`, `>`, ...)
    /// and the historical aliases (`neq`, `xin`, `xincludes`, `nlike`,
    /// `xcontains`). Fails closed on anything else.
    pub fn parse(raw: &str) -> Result<Self, CompileError> {
        let token = raw.trim().trim_start_matches('$').to_lowercase();
        let op = match token.as_str() {
            "eq" | "=" | "==" => Operator::Eq,
            "ne" | "neq" | "!=" => Operator::Ne,
            "gt" | ">" => Operator::Gt,
            "gte" | ">=" => Operator::Gte,
            "lt" | "<" => Operator::Lt,
            "lte" | "<=" => Operator::Lte,
            "in" => Operator::In,
            "notin" | "nin" | "xin" => Operator::NotIn,
            "includes" => Operator::Includes,
            "notincludes" | "xincludes" => Operator::NotIncludes,
            "null" => Operator::Null,
            "notnull" => Operator::NotNull,
            "startswith" => Operator::StartsWith,
            "endswith" => Operator::EndsWith,
            "contains" => Operator::Contains,
            "notcontains" | "xcontains" => Operator::NotContains,
            "like" => Operator::Like,
            "notlike" | "nlike" => Operator::NotLike,
            "between" => Operator::Between,
            "exists" => Operator::Exists,
            "notexists" => Operator::NotExists,
            _ => return Err(CompileError::UnknownOperator(raw.to_string())),
        };
        Ok(op)
    }

    /// Canonical operator name.
    pub fn name(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::NotIn => "notin",
            Operator::Includes => "includes",
            Operator::NotIncludes => "notincludes",
            Operator::Null => "null",
            Operator::NotNull => "notnull",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
            Operator::Contains => "contains",
            Operator::NotContains => "notcontains",
            Operator::Like => "like",
            Operator::NotLike => "notlike",
            Operator::Between => "between",
            Operator::Exists => "exists",
            Operator::NotExists => "notexists",
        }
    }

    /// True for operators whose generated expression puts the operand on
    /// the left of the field (`"value" IN doc.tags`).
    pub fn reverses_operands(self) -> bool {
        matches!(self, Operator::Includes | Operator::NotIncludes)
    }

    /// True when the operator binds no operand value at all.
    pub fn takes_operand(self) -> bool {
        !matches!(
            self,
            Operator::Null | Operator::NotNull | Operator::Exists | Operator::NotExists
        )
    }

    /// The remote-backend rendering shape (`toQueryText` side of the table).
    pub fn aql_form(self) -> AqlForm {
        match self {
            Operator::Eq => AqlForm::Infix("=="),
            Operator::Ne => AqlForm::Infix("!="),
            Operator::Gt => AqlForm::Infix(">"),
            Operator::Gte => AqlForm::Infix(">="),
            Operator::Lt => AqlForm::Infix("<"),
            Operator::Lte => AqlForm::Infix("<="),
            Operator::In => AqlForm::Infix("IN"),
            Operator::NotIn => AqlForm::Infix("NOT IN"),
            Operator::Includes => AqlForm::InfixReversed("IN"),
            Operator::NotIncludes => AqlForm::InfixReversed("NOT IN"),
            Operator::Null => AqlForm::NullCheck("=="),
            Operator::NotNull => AqlForm::NullCheck("!="),
            Operator::StartsWith => AqlForm::Pattern {
                keyword: "LIKE",
                prefix: "",
                suffix: "%",
            },
            Operator::EndsWith => AqlForm::Pattern {
                keyword: "LIKE",
                prefix: "%",
                suffix: "",
            },
            Operator::Contains => AqlForm::Pattern {
                keyword: "LIKE",
                prefix: "%",
                suffix: "%",
            },
            Operator::NotContains => AqlForm::Pattern {
                keyword: "NOT LIKE",
                prefix: "%",
                suffix: "%",
            },
            Operator::Like => AqlForm::Pattern {
                keyword: "LIKE",
                prefix: "",
                suffix: "",
            },
            Operator::NotLike => AqlForm::Pattern {
                keyword: "NOT LIKE",
                prefix: "",
                suffix: "",
            },
            Operator::Between => AqlForm::Range,
            Operator::Exists => AqlForm::Existence { negated: false },
            Operator::NotExists => AqlForm::Existence { negated: true },
        }
    }

    /// The operand value actually bound for the remote backend.
    ///
    /// Pattern operators wrap the operand in their `%` wildcards; everything
    /// else binds the operand as-is.
    pub fn bind_value(self, value: Value) -> Value {
        match self.aql_form() {
            AqlForm::Pattern { prefix, suffix, .. } => {
                Value::String(format!("{prefix}{}{suffix}", text_of(&value)))
            }
            _ => value,
        }
    }

    /// The in-memory predicate (`toPredicate` side of the table).
    ///
    /// `field` is `None` when the record has no such key, which is distinct
    /// from a present `Value::Null`. Operand/field type mismatches yield
    /// `false` rather than an error: the stored data is heterogeneous and
    /// the matcher must stay robust against it.
    pub fn to_predicate(self, field: Option<&Value>, operand: &Value) -> bool {
        match self {
            Operator::Eq => field.is_some_and(|f| values_equal(f, operand)),
            Operator::Ne => !field.is_some_and(|f| values_equal(f, operand)),
            Operator::Gt => compare_ordered(field, operand)
                .is_some_and(|ord| ord == Ordering::Greater),
            Operator::Gte => compare_ordered(field, operand)
                .is_some_and(|ord| ord != Ordering::Less),
            Operator::Lt => {
                compare_ordered(field, operand).is_some_and(|ord| ord == Ordering::Less)
            }
            Operator::Lte => compare_ordered(field, operand)
                .is_some_and(|ord| ord != Ordering::Greater),

            Operator::In => match (field, operand) {
                (Some(Value::Array(items)), Value::Array(candidates)) => items
                    .iter()
                    .any(|item| candidates.iter().any(|c| values_equal(item, c))),
                (Some(f), Value::Array(candidates)) => {
                    candidates.iter().any(|c| values_equal(f, c))
                }
                _ => false,
            },
            Operator::NotIn => match operand {
                Value::Array(candidates) => {
                    !field.is_some_and(|f| candidates.iter().any(|c| values_equal(f, c)))
                }
                _ => false,
            },

            Operator::Includes => field.is_some_and(|f| member_of(f, operand)),
            Operator::NotIncludes => match field {
                Some(f @ (Value::Array(_) | Value::String(_) | Value::Object(_))) => {
                    !member_of(f, operand)
                }
                _ => false,
            },

            Operator::Null => field.is_some_and(Value::is_null),
            Operator::NotNull => !field.is_some_and(Value::is_null),

            Operator::StartsWith => match (field, operand) {
                (Some(Value::String(s)), Value::String(prefix)) => s.starts_with(prefix),
                _ => false,
            },
            Operator::EndsWith => match (field, operand) {
                (Some(Value::String(s)), Value::String(suffix)) => s.ends_with(suffix),
                _ => false,
            },

            Operator::Contains => match (field, operand) {
                (Some(Value::String(s)), Value::String(needle)) => s.contains(needle),
                _ => false,
            },
            Operator::NotContains => match (field, operand) {
                (Some(Value::String(s)), Value::String(needle)) => !s.contains(needle),
                _ => false,
            },

            Operator::Like => match (field, operand) {
                (Some(Value::String(s)), Value::String(pattern)) => like_match(s, pattern),
                _ => false,
            },
            Operator::NotLike => match (field, operand) {
                (Some(Value::String(s)), Value::String(pattern)) => !like_match(s, pattern),
                _ => false,
            },

            Operator::Between => match operand {
                Value::Array(bounds) if bounds.len() == 2 => {
                    compare_ordered(field, &bounds[0]).is_some_and(|ord| ord != Ordering::Less)
                        && compare_ordered(field, &bounds[1])
                            .is_some_and(|ord| ord != Ordering::Greater)
                }
                _ => false,
            },

            Operator::Exists => field.is_some(),
            Operator::NotExists => field.is_none(),
        }
    }
}

/// Grouped scalar reductions for the remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    /// Row count (`LENGTH`); reduces over the literal `1`
    Count,
    Sum,
    Min,
    Max,
}

impl AggregateOp {
    /// Parse an aggregation token; `length` and `size` alias `count`.
    pub fn parse(raw: &str) -> Result<Self, CompileError> {
        let token = raw.trim().trim_start_matches('$').to_lowercase();
        match token.as_str() {
            "count" | "length" | "size" => Ok(AggregateOp::Count),
            "sum" => Ok(AggregateOp::Sum),
            "min" => Ok(AggregateOp::Min),
            "max" => Ok(AggregateOp::Max),
            _ => Err(CompileError::UnknownOperator(raw.to_string())),
        }
    }

    pub fn aql_fn(self) -> &'static str {
        match self {
            AggregateOp::Count => "LENGTH",
            AggregateOp::Sum => "SUM",
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
        }
    }
}

/// Type-aware equality: integers and floats representing the same number
/// compare equal; everything else falls back to structural equality.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (as_decimal(a), as_decimal(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordered comparison for the subset of type pairs that order naturally:
/// numbers against numbers (decimal-exact), strings against strings,
/// booleans against booleans. Everything else is unordered.
pub(crate) fn compare_ordered(field: Option<&Value>, operand: &Value) -> Option<Ordering> {
    let field = field?;
    if let (Some(x), Some(y)) = (as_decimal(field), as_decimal(operand)) {
        return Some(x.cmp(&y));
    }
    match (field, operand) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

pub(crate) fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(n) => Decimal::from_i64(*n),
        Value::Float(n) => Decimal::from_f64(*n),
        _ => None,
    }
}

/// Membership test used by the `includes` family: array containment,
/// substring, or object-key presence.
fn member_of(container: &Value, needle: &Value) -> bool {
    match container {
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        Value::String(s) => match needle {
            Value::String(sub) => s.contains(sub.as_str()),
            _ => false,
        },
        Value::Object(map) => match needle {
            Value::String(key) => map.contains_key(key),
            _ => false,
        },
        _ => false,
    }
}

/// `%`-wildcard pattern match, anchored at both ends.
fn like_match(text: &str, pattern: &str) -> bool {
    let literal: Vec<String> = pattern.split('%').map(|p| regex::escape(p)).collect();
    let rx = format!("^{}$", literal.join(".*"));
    regex::Regex::new(&rx).map(|re| re.is_match(text)).unwrap_or(false)
}

/// Text coercion for `%`-wildcard patterns (scalar operands only).
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => format!("{:?}", other),
    }
}
