//! In-memory predicate evaluation.
//!
//! [`Matcher`] applies a [`FilterSpec`] to records held in memory, using
//! the same operator catalogue the remote compiler renders from. Records
//! are matched in flattened (dotted-key) form so nested paths address
//! uniformly; [`query`] wraps the flatten/filter/unflatten round trip over
//! a whole record list.
//!
//! Unlike the remote compiler, nothing here raises: the stored data is
//! heterogeneous, so operand/field type mismatches simply fail the clause.
//! A missing field is distinct from a present null — `exists`/`notexists`
//! see the difference.

use crate::ast::filter::{FilterClause, FilterEntry, FilterSpec};
use crate::flatten::{flatten, unflatten};
use crate::macros;
use crate::value::Value;

/// Evaluates filter specifications against single records.
pub struct Matcher;

impl Matcher {
    /// Match one flattened record. Entries are conjoined; `$or` groups
    /// pass when any of their sub-specifications passes.
    pub fn matches(spec: &FilterSpec, record: &Value) -> bool {
        spec.entries()
            .iter()
            .all(|entry| Self::entry_matches(entry, record))
    }

    fn entry_matches(entry: &FilterEntry, record: &Value) -> bool {
        match entry {
            FilterEntry::Clause(clause) => Self::clause_matches(clause, record),
            FilterEntry::Any(groups) => {
                groups.iter().any(|group| Self::matches(group, record))
            }
        }
    }

    fn clause_matches(clause: &FilterClause, record: &Value) -> bool {
        let Some(map) = record.as_object() else {
            return false;
        };
        let operand = macros::eval(&clause.value);

        // wildcard-array paths quantify existentially over the array
        if let Some((base, sub)) = clause.path.wildcard() {
            return match map.get(base) {
                Some(Value::Array(items)) => items.iter().any(|item| {
                    let field = item.as_object().and_then(|m| m.get(sub));
                    clause.op.to_predicate(field, &operand)
                }),
                _ => false,
            };
        }

        clause.op.to_predicate(map.get(clause.path.as_str()), &operand)
    }
}

/// Filter a record list: flatten each record, keep the matches, restore
/// the nested shape. An empty specification keeps everything.
///
/// # Examples
///
/// ```
/// use xql_lang::{matcher, FilterSpec, Value};
///
/// let data = vec![
///     Value::from(serde_json::json!({"city": "LA", "age": 33})),
///     Value::from(serde_json::json!({"city": "SF", "age": 19})),
/// ];
/// let filters = FilterSpec::new().with("city:eq", "LA").unwrap();
/// assert_eq!(matcher::query(&data, &filters).len(), 1);
/// ```
pub fn query(data: &[Value], filters: &FilterSpec) -> Vec<Value> {
    if filters.is_empty() {
        return data.to_vec();
    }
    data.iter()
        .map(flatten)
        .filter(|record| Matcher::matches(filters, record))
        .map(|record| unflatten(&record))
        .collect()
}
