use crate::ast::operators::Operator;
use crate::error::CompileError;
use crate::value::Value;

/// A dot-separated field path, optionally carrying one wildcard-array
/// segment (`friends[*].city`).
///
/// Wildcard paths are a distinct matcher mode: the predicate holds when
/// *any* element of the named array satisfies it over the sub-path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
}

impl FieldPath {
    pub fn new(path: impl Into<String>) -> Self {
        FieldPath { raw: path.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Split a wildcard path into `(array_path, element_sub_path)`.
    pub fn wildcard(&self) -> Option<(&str, &str)> {
        self.raw.split_once("[*].")
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One comparison: a field path, an operator and an operand value.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub path: FieldPath,
    pub op: Operator,
    pub value: Value,
}

/// An entry in a filter specification.
///
/// Entries are conjoined: every entry must hold for a record to match.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEntry {
    /// A single comparison clause
    Clause(FilterClause),

    /// An `$or` group: the entry holds when any of the sub-specifications
    /// holds; within each sub-specification entries are conjoined as usual.
    Any(Vec<FilterSpec>),
}

/// An ordered filter specification.
///
/// Built from qualifier strings of the form `path` or `path:operator`
/// (operator lookup is case-insensitive and tolerates a leading `$`), or
/// parsed from the equivalent JSON mapping. Unknown operators and unknown
/// `$`-prefixed logic keys fail at construction, never later.
///
/// # Examples
///
/// ```
/// use xql_lang::{FilterSpec, Value};
///
/// let mut filters = FilterSpec::new();
/// filters.push("age:gte", 18).unwrap();
/// filters.push("city:in", vec!["NY", "LA"]).unwrap();
/// assert_eq!(filters.paths(), vec!["age".to_string(), "city".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    entries: Vec<FilterEntry>,
}

impl FilterSpec {
    pub fn new() -> Self {
        FilterSpec::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    /// Append a clause parsed from a `path[:operator]` qualifier.
    pub fn push(&mut self, qualifier: &str, value: impl Into<Value>) -> Result<(), CompileError> {
        let (path, op) = parse_qualifier(qualifier)?;
        self.entries.push(FilterEntry::Clause(FilterClause {
            path,
            op,
            value: value.into(),
        }));
        Ok(())
    }

    /// Append an `$or` group over the given sub-specifications.
    pub fn push_any(&mut self, groups: Vec<FilterSpec>) {
        self.entries.push(FilterEntry::Any(groups));
    }

    /// Chaining form of [`FilterSpec::push`].
    pub fn with(mut self, qualifier: &str, value: impl Into<Value>) -> Result<Self, CompileError> {
        self.push(qualifier, value)?;
        Ok(self)
    }

    /// Chaining form of [`FilterSpec::push_any`].
    pub fn with_any(mut self, groups: Vec<FilterSpec>) -> Self {
        self.push_any(groups);
        self
    }

    /// Build a specification from `(qualifier, value)` pairs.
    pub fn from_pairs<S: AsRef<str>, V: Into<Value>>(
        pairs: impl IntoIterator<Item = (S, V)>,
    ) -> Result<Self, CompileError> {
        let mut spec = FilterSpec::new();
        for (qualifier, value) in pairs {
            spec.push(qualifier.as_ref(), value)?;
        }
        Ok(spec)
    }

    /// Parse the JSON mapping form.
    ///
    /// Plain keys are qualifiers. An `$or` key takes either a mapping
    /// (each pair becomes its own alternative) or an array of mappings
    /// (each mapping is one alternative, its pairs conjoined). Any other
    /// `$`-prefixed key is rejected.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CompileError> {
        let map = json
            .as_object()
            .ok_or_else(|| CompileError::InvalidSpec("filters must be an object".to_string()))?;

        let mut spec = FilterSpec::new();
        for (key, raw) in map {
            if let Some(stripped) = key.strip_prefix('$') {
                if !stripped.eq_ignore_ascii_case("or") {
                    return Err(CompileError::UnknownLogicKey(key.clone()));
                }
                spec.push_any(parse_or_groups(key, raw)?);
            } else {
                spec.push(key, Value::from(raw))?;
            }
        }
        Ok(spec)
    }

    /// All field paths referenced by the specification, groups included.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_paths(self, &mut out);
        out.sort();
        out.dedup();
        out
    }
}

fn collect_paths(spec: &FilterSpec, out: &mut Vec<String>) {
    for entry in &spec.entries {
        match entry {
            FilterEntry::Clause(clause) => out.push(clause.path.as_str().to_string()),
            FilterEntry::Any(groups) => {
                for group in groups {
                    collect_paths(group, out);
                }
            }
        }
    }
}

fn parse_or_groups(key: &str, raw: &serde_json::Value) -> Result<Vec<FilterSpec>, CompileError> {
    match raw {
        // a flat mapping fans out into one alternative per pair
        serde_json::Value::Object(map) => {
            let mut groups = Vec::with_capacity(map.len());
            for (k, v) in map {
                let single = serde_json::Value::Object(
                    [(k.clone(), v.clone())].into_iter().collect(),
                );
                groups.push(FilterSpec::from_json(&single)?);
            }
            Ok(groups)
        }
        serde_json::Value::Array(items) => {
            items.iter().map(FilterSpec::from_json).collect()
        }
        _ => Err(CompileError::InvalidSpec(format!(
            "{key} takes an object or an array of objects"
        ))),
    }
}

/// Split a qualifier into its path and operator; the operator defaults to
/// `eq` when the qualifier has no `:` suffix. `$`-prefixed keys are logic
/// keys, not field paths ([`FilterSpec::push_any`] builds those).
pub fn parse_qualifier(qualifier: &str) -> Result<(FieldPath, Operator), CompileError> {
    if qualifier.starts_with('$') {
        return Err(CompileError::UnknownLogicKey(qualifier.to_string()));
    }
    match qualifier.split_once(':') {
        Some((path, op)) => Ok((FieldPath::new(path), Operator::parse(op)?)),
        None => Ok((FieldPath::new(qualifier), Operator::Eq)),
    }
}
