//! XQL to AQL compilation.
//!
//! [`compile`] lowers an [`XqlNode`] tree into one parameterized AQL query:
//! source scan, filter clauses, correlated join sub-queries, sort clause,
//! pagination and a final projection (or aggregation, or a count wrapper).
//! The output pairs the query text with a bind-variable map ready for
//! submission to the remote engine's execute entry point.
//!
//! Bind-variable and loop-variable names are suffixed from a monotone
//! arena threaded through the whole compile, so names never collide across
//! sibling or nested nodes and the generated text is deterministic for a
//! given specification.

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::filter::{FilterClause, FilterEntry, FilterSpec};
use crate::ast::node::{AggregateSpec, DEFAULT_UNSET_KEYS, MAX_LIMIT, XqlNode};
use crate::ast::operators::{AggregateOp, AqlForm, Operator};
use crate::ast::sort::SortSpec;
use crate::error::CompileError;
use crate::macros;
use crate::value::Value;

/// Bind-variable map accompanying a compiled query.
pub type BindVars = BTreeMap<String, Value>;

/// A compiled query: AQL text plus its bind variables, and the resolved
/// pagination of the root node for result-page bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub text: String,
    pub bind_vars: BindVars,
    pub page: u64,
    pub per_page: u64,
}

impl CompiledQuery {
    /// Merge caller-supplied bind variables (for `"#@name"` references).
    pub fn with_vars(mut self, vars: BindVars) -> Self {
        self.bind_vars.extend(vars);
        self
    }

    /// The bind-variable map in `serde_json` form.
    pub fn bind_vars_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.bind_vars
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// The remote query engine, consumed as an opaque collaborator.
pub trait QueryExecutor {
    type Error;

    fn execute(&self, query: &str, bind_vars: &BindVars) -> Result<Vec<Value>, Self::Error>;
}

/// Monotone suffix arena; one per compile call, threaded down the tree.
#[derive(Debug)]
pub(crate) struct IdArena {
    next: u64,
}

impl IdArena {
    pub(crate) fn new() -> Self {
        IdArena { next: 1 }
    }

    pub(crate) fn next_suffix(&mut self) -> u64 {
        let suffix = self.next;
        self.next += 1;
        suffix
    }
}

/// Compile a query node tree with the default limit ceiling.
///
/// # Examples
///
/// ```
/// use xql_lang::{compile, FilterSpec, XqlNode};
///
/// let node = XqlNode::new("users")
///     .filters(FilterSpec::new().with("age:gte", 18).unwrap());
/// let query = compile(&node).unwrap();
/// assert!(query.text.starts_with("FOR doc IN @@collection_1"));
/// assert!(query.bind_vars.contains_key("@collection_1"));
/// ```
pub fn compile(node: &XqlNode) -> Result<CompiledQuery, CompileError> {
    compile_with_limit(node, MAX_LIMIT)
}

/// Compile with an explicit limit ceiling.
pub fn compile_with_limit(node: &XqlNode, max_limit: u64) -> Result<CompiledQuery, CompileError> {
    let mut arena = IdArena::new();
    let (text, bind_vars, page, per_page) = compile_node(node, max_limit, &mut arena)?;
    debug!(
        collections = ?node.collections(),
        bind_vars = bind_vars.len(),
        "compiled query"
    );
    Ok(CompiledQuery {
        text,
        bind_vars,
        page,
        per_page,
    })
}

fn compile_node(
    node: &XqlNode,
    max_limit: u64,
    arena: &mut IdArena,
) -> Result<(String, BindVars, u64, u64), CompileError> {
    if node.source.is_empty() {
        return Err(CompileError::InvalidSpec(
            "query node has no source collection".to_string(),
        ));
    }

    let alias = node.effective_alias();
    let suffix = arena.next_suffix();
    let (limit, offset, page) = node.resolve_paging(max_limit);

    let mut bind_vars = BindVars::new();
    let filter_text = compile_filters(&node.filters, alias, arena, &mut bind_vars)?;

    let mut join_text = String::new();
    for join in &node.joins {
        let (sub_text, sub_vars, _, _) = compile_node(join, max_limit, arena)?;
        join_text.push_str(&format!("LET {} = (\n{})\n", join.effective_alias(), sub_text));
        bind_vars.extend(sub_vars);
    }

    let mut query = format!("FOR {alias} IN @@collection_{suffix}\n");
    query.push_str(&filter_text);
    query.push_str(&join_text);
    query.push_str(&compile_sort(&node.sort, alias));

    if !node.return_count && !node.skip_limit {
        query.push_str(&format!("LIMIT @offset_{suffix}, @limit_{suffix}\n"));
        bind_vars.insert(format!("offset_{suffix}"), Value::Integer(offset as i64));
        bind_vars.insert(format!("limit_{suffix}"), Value::Integer(limit as i64));
    }

    // count-of-all takes priority and skips aggregation entirely
    let aggregation = if node.return_count || node.aggregations.is_empty() {
        None
    } else {
        Some(compile_aggregations(&node.aggregations, alias)?)
    };

    if !node.partial && aggregation.is_none() {
        let projection = node.projection.as_deref().unwrap_or(alias);
        query.push_str(&format!(
            "RETURN UNSET_RECURSIVE({projection}, [{}])\n",
            unset_list(&node.unset_keys)
        ));
    }

    if node.return_count {
        query = format!("RETURN LENGTH(\n{query})");
    } else if let Some((reductions, keys)) = aggregation {
        query.push_str(&format!("COLLECT AGGREGATE {reductions}\nRETURN {{ {keys} }}\n"));
    }

    bind_vars.insert(
        format!("@collection_{suffix}"),
        Value::String(node.source.clone()),
    );

    Ok((query, bind_vars, page, limit))
}

/// Render a filter specification into `FILTER (...)` lines, binding
/// operand values along the way.
pub(crate) fn compile_filters(
    spec: &FilterSpec,
    propkey: &str,
    arena: &mut IdArena,
    bind_vars: &mut BindVars,
) -> Result<String, CompileError> {
    let mut out = String::new();
    for entry in spec.entries() {
        let expr = compile_entry(entry, propkey, arena, bind_vars)?;
        out.push_str(&format!("FILTER ({expr})\n"));
    }
    Ok(out)
}

fn compile_entry(
    entry: &FilterEntry,
    propkey: &str,
    arena: &mut IdArena,
    bind_vars: &mut BindVars,
) -> Result<String, CompileError> {
    match entry {
        FilterEntry::Clause(clause) => compile_clause(clause, propkey, arena, bind_vars),
        FilterEntry::Any(groups) => {
            let mut alternatives = Vec::with_capacity(groups.len());
            for group in groups {
                if group.is_empty() {
                    alternatives.push("true".to_string());
                    continue;
                }
                let mut conjuncts = Vec::with_capacity(group.entries().len());
                for sub in group.entries() {
                    conjuncts.push(compile_entry(sub, propkey, arena, bind_vars)?);
                }
                alternatives.push(format!("({})", conjuncts.join(" AND ")));
            }
            Ok(alternatives.join(" OR "))
        }
    }
}

fn compile_clause(
    clause: &FilterClause,
    propkey: &str,
    arena: &mut IdArena,
    bind_vars: &mut BindVars,
) -> Result<String, CompileError> {
    let value = macros::eval(&clause.value);
    let path = clause.path.as_str();
    let field = format!("{propkey}.{path}");
    let suffix = arena.next_suffix();

    // literal-reference values render as raw identifiers, not bound params
    if let Value::String(s) = &value {
        if let Some(reference) = s.strip_prefix('#') {
            return render_reference(clause.op, &field, propkey, path, reference);
        }
    }

    match clause.op.aql_form() {
        AqlForm::Infix(op) => {
            if matches!(clause.op, Operator::In | Operator::NotIn)
                && !matches!(value, Value::Array(_))
            {
                return Err(CompileError::InvalidOperand {
                    operator: clause.op.name(),
                    expected: "an array operand",
                });
            }
            let key = bind_key(path, suffix);
            bind_vars.insert(key.clone(), value);
            Ok(format!("{field} {op} @{key}"))
        }
        AqlForm::InfixReversed(op) => {
            let key = bind_key(path, suffix);
            bind_vars.insert(key.clone(), value);
            Ok(format!("@{key} {op} {field}"))
        }
        AqlForm::NullCheck(op) => Ok(format!("{field} {op} null")),
        AqlForm::Pattern { keyword, .. } => {
            let key = bind_key(path, suffix);
            bind_vars.insert(key.clone(), clause.op.bind_value(value));
            Ok(format!("{field} {keyword} @{key}"))
        }
        AqlForm::Range => {
            let Value::Array(bounds) = &value else {
                return Err(CompileError::BetweenOperands);
            };
            let [low, high] = bounds.as_slice() else {
                return Err(CompileError::BetweenOperands);
            };
            let gte = bind_key(&format!("{path}_gte"), suffix);
            let lte = bind_key(&format!("{path}_lte"), suffix);
            bind_vars.insert(gte.clone(), low.clone());
            bind_vars.insert(lte.clone(), high.clone());
            Ok(format!("{field} >= @{gte} AND {field} <= @{lte}"))
        }
        AqlForm::Existence { negated } => Ok(render_existence(propkey, path, negated)),
    }
}

fn render_reference(
    op: Operator,
    field: &str,
    propkey: &str,
    path: &str,
    reference: &str,
) -> Result<String, CompileError> {
    // "#@name" references a caller-supplied bind variable, "#a.b" a raw
    // identifier such as a parent alias in a correlated join
    let reference = reference.to_string();
    match op.aql_form() {
        AqlForm::Infix(op) => Ok(format!("{field} {op} {reference}")),
        AqlForm::InfixReversed(op) => Ok(format!("{reference} {op} {field}")),
        AqlForm::Pattern { keyword, .. } => Ok(format!("{field} {keyword} {reference}")),
        AqlForm::NullCheck(op) => Ok(format!("{field} {op} null")),
        AqlForm::Existence { negated } => Ok(render_existence(propkey, path, negated)),
        AqlForm::Range => Err(CompileError::BetweenOperands),
    }
}

fn render_existence(propkey: &str, path: &str, negated: bool) -> String {
    let (parent, attribute) = match path.rsplit_once('.') {
        Some((head, tail)) => (format!("{propkey}.{head}"), tail),
        None => (propkey.to_string(), path),
    };
    let has = format!("HAS({parent}, \"{attribute}\")");
    if negated { format!("NOT {has}") } else { has }
}

/// Render the `SORT` clause for the remote backend.
pub(crate) fn compile_sort(sort: &SortSpec, propkey: &str) -> String {
    if sort.is_empty() {
        return String::new();
    }
    let keys: Vec<String> = sort
        .fields()
        .iter()
        .map(|field| format!("{propkey}.{} {}", field.path, field.direction.keyword()))
        .collect();
    format!("SORT {}\n", keys.join(", "))
}

/// Render grouped reductions: `(reduction list, returned key list)`.
fn compile_aggregations(
    spec: &AggregateSpec,
    propkey: &str,
) -> Result<(String, String), CompileError> {
    let mut reductions = Vec::with_capacity(spec.entries().len());
    let mut keys = Vec::with_capacity(spec.entries().len());
    for entry in spec.entries() {
        let rendered = match entry.op {
            AggregateOp::Count => {
                format!("{} = {}(1)", entry.alias, entry.op.aql_fn())
            }
            _ => {
                let source = entry.source.as_deref().ok_or_else(|| {
                    CompileError::InvalidSpec(format!(
                        "aggregation '{}' needs a source field",
                        entry.alias
                    ))
                })?;
                format!("{} = {}({propkey}.{source})", entry.alias, entry.op.aql_fn())
            }
        };
        reductions.push(rendered);
        keys.push(entry.alias.clone());
    }
    Ok((reductions.join(", "), keys.join(", ")))
}

fn unset_list(extra: &[String]) -> String {
    DEFAULT_UNSET_KEYS
        .iter()
        .map(|k| (*k).to_string())
        .chain(extra.iter().cloned())
        .map(|k| format!("'{k}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Unique, AQL-safe bind-variable name derived from a field path and an
/// arena suffix.
pub(crate) fn bind_key(path: &str, suffix: u64) -> String {
    format!("{}_{suffix}", slug(path))
}

fn slug(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_sep = true;
    for ch in path.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// True when a query text contains document-modifying operations. Useful
/// as a guard before executing text that is only ever meant to read.
pub fn has_modifier_operations(aql: &str) -> bool {
    const MODIFIERS: [&str; 5] = ["REMOVE", "UPDATE", "REPLACE", "INSERT", "UPSERT"];
    aql.split_whitespace()
        .any(|word| MODIFIERS.contains(&word.to_uppercase().as_str()))
}
