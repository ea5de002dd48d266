//! Graph traversal compilation.
//!
//! [`compile_traversal`] lowers a [`TraversalNode`] into a multi-hop,
//! directed, depth-bounded AQL traversal with per-hop edge and vertex
//! filters. Joins compile recursively into named sub-relations whose rows
//! are grouped by the `_kind` tag of the edge that produced them, so a
//! caller can pick apart each parent row's children by relationship type.
//!
//! Start-point resolution tries, in order: the node's explicit vertex, the
//! parent hop's edge target, and — when a `kind` is given with neither —
//! a preliminary scan of the edge collection by kind (the broad-search
//! mode). A node with none of the three is a compile-time error.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::traversal::TraversalNode;
use crate::compiler::{BindVars, IdArena, compile_filters};
use crate::error::CompileError;
use crate::value::Value;

/// Limit applied when a traversal node specifies none.
const DEFAULT_TRAVERSAL_LIMIT: u64 = 100;

/// A compiled traversal: AQL text, bind variables and the root hop's
/// arena index (loop variables are `v_{idx}`, `e_{idx}`, `p_{idx}`).
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTraversal {
    pub text: String,
    pub bind_vars: BindVars,
    pub idx: u64,
}

/// Compile a traversal node tree.
///
/// # Examples
///
/// ```
/// use xql_lang::{compile_traversal, TraversalNode};
///
/// let hop = TraversalNode::new("edges").kind("orgs:projects");
/// let compiled = compile_traversal(&hop).unwrap();
/// assert!(compiled.text.contains("FOR xe_1 IN edges"));
/// ```
pub fn compile_traversal(node: &TraversalNode) -> Result<CompiledTraversal, CompileError> {
    let mut arena = IdArena::new();
    let compiled = compile_hop(node, None, None, &mut arena)?;
    debug!(bind_vars = compiled.bind_vars.len(), "compiled traversal");
    Ok(compiled)
}

fn compile_hop(
    node: &TraversalNode,
    parent_idx: Option<u64>,
    inherited_edges: Option<&str>,
    arena: &mut IdArena,
) -> Result<CompiledTraversal, CompileError> {
    let idx = arena.next_suffix();
    let mut bind_vars = BindVars::new();

    let edge_collection = node
        .edge_collection
        .as_deref()
        .or(inherited_edges)
        .ok_or_else(|| {
            CompileError::InvalidSpec("traversal has no edge collection".to_string())
        })?;

    let mut preamble = String::new();
    let start = if let Some(vertex) = &node.start_vertex {
        bind_vars.insert(
            format!("start_vertex_{idx}"),
            Value::String(vertex.clone()),
        );
        format!("@start_vertex_{idx}")
    } else if let Some(parent) = parent_idx {
        // chain from the parent hop's traversed edge
        format!("e_{parent}._to")
    } else if let Some(kind) = &node.kind {
        // broad search: derive a start per matching edge of this kind
        bind_vars.insert(format!("xe_kind_{idx}"), Value::String(kind.clone()));
        preamble = format!(
            "FOR xe_{idx} IN {edge_collection}\nFILTER xe_{idx}._kind == @xe_kind_{idx}\n"
        );
        format!("xe_{idx}._from")
    } else {
        return Err(CompileError::MissingStartVertex);
    };

    // the kind always narrows the traversed edges as well
    let mut edge_filters = node.edge_filters.clone();
    if let Some(kind) = &node.kind {
        edge_filters.push("_kind", kind.as_str())?;
    }

    let edge_prop = format!("e_{idx}");
    let vertex_prop = format!("v_{idx}");
    let mut filter_text = compile_filters(&edge_filters, &edge_prop, arena, &mut bind_vars)?;
    filter_text.push_str(&compile_filters(
        &node.node_filters,
        &vertex_prop,
        arena,
        &mut bind_vars,
    )?);

    let (join_text, kinds_expr) = if node.joins.is_empty() {
        (
            format!("LET rel_{idx} = null\n"),
            format!("{{ [rel_{idx}[0][\"@edge\"]._kind]: rel_{idx} }}"),
        )
    } else {
        let mut join_text = String::new();
        let mut groups = Vec::with_capacity(node.joins.len());
        for (i, join) in node.joins.iter().enumerate() {
            let sub = compile_hop(join, Some(idx), Some(edge_collection), arena)?;
            let rel = format!("rel_{idx}_{i}");
            join_text.push_str(&format!("LET {rel} = (\n{})\n", sub.text));
            groups.push(format!("{{ [{rel}[0][\"@edge\"]._kind]: {rel} }}"));
            bind_vars.extend(sub.bind_vars);
        }
        let kinds_expr = match groups.len() {
            1 => groups.remove(0),
            _ => format!("MERGE({})", groups.join(", ")),
        };
        (join_text, kinds_expr)
    };

    let limit = node.limit.unwrap_or(DEFAULT_TRAVERSAL_LIMIT);
    let offset = node.offset.unwrap_or(0);
    bind_vars.insert(format!("offset_{idx}"), Value::Integer(offset as i64));
    bind_vars.insert(format!("limit_{idx}"), Value::Integer(limit as i64));

    let (depth_min, depth_max) = node.depth.bounds();
    let direction = node.direction.keyword();

    let mut text = preamble;
    text.push_str(&format!(
        "FOR v_{idx}, e_{idx}, p_{idx} IN {depth_min}..{depth_max} {direction} {start} {edge_collection}\n"
    ));
    text.push_str(&filter_text);
    text.push_str(&join_text);
    text.push_str(&format!("LIMIT @offset_{idx}, @limit_{idx}\n"));
    text.push_str(&format!(
        "RETURN {{ \"@item\": v_{idx}, \"@edge\": e_{idx}, \"@paths\": p_{idx}, \"@kinds\": {kinds_expr} }}\n"
    ));

    Ok(CompiledTraversal {
        text,
        bind_vars,
        idx,
    })
}

/// One parsed traversal result row.
///
/// The raw rows returned for a compiled traversal carry the reached vertex
/// (`@item`), the edge that produced it (`@edge`), the path (`@paths`) and
/// the joined sub-relations grouped by edge kind (`@kinds`). This view
/// unpacks them, additionally grouping path vertices by the collection
/// half of their `_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraversalRow {
    pub item: Option<Value>,
    pub edge: Option<Value>,
    pub paths: Option<Value>,
    /// The traversal's origin vertex: first vertex on the path.
    pub root: Option<Value>,
    pub kinds: HashMap<String, Vec<TraversalRow>>,
    pub collections: HashMap<String, Vec<Value>>,
}

impl TraversalRow {
    /// Unpack one result row; absent or null fields stay `None`.
    pub fn from_row(row: &Value) -> Self {
        let Some(map) = row.as_object() else {
            return TraversalRow::default();
        };

        let field = |name: &str| map.get(name).filter(|v| !v.is_null()).cloned();
        let item = field("@item");
        let edge = field("@edge");
        let paths = field("@paths");

        let mut kinds = HashMap::new();
        if let Some(Value::Object(groups)) = map.get("@kinds") {
            for (kind, rows) in groups {
                let Some(rows) = rows.as_array() else { continue };
                if kind.is_empty() || rows.is_empty() {
                    continue;
                }
                kinds.insert(
                    kind.clone(),
                    rows.iter().map(TraversalRow::from_row).collect(),
                );
            }
        }

        let vertices: Vec<Value> = paths
            .as_ref()
            .and_then(|p| p.as_object())
            .and_then(|p| p.get("vertices"))
            .and_then(|v| v.as_array())
            .map(|v| v.to_vec())
            .unwrap_or_default();

        let root = vertices.iter().find(|v| !v.is_null()).cloned();

        let mut collections: HashMap<String, Vec<Value>> = HashMap::new();
        for vertex in vertices {
            let Some(id) = vertex.as_object().and_then(|v| v.get("_id")) else {
                continue;
            };
            if let Some((collection, _)) = id.as_str().and_then(|id| id.split_once('/')) {
                collections
                    .entry(collection.to_string())
                    .or_default()
                    .push(vertex);
            }
        }

        TraversalRow {
            item,
            edge,
            paths,
            root,
            kinds,
            collections,
        }
    }

    /// Child rows produced through edges of the given kind.
    pub fn of_kind(&self, kind: &str) -> &[TraversalRow] {
        self.kinds.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Path vertices belonging to the given collection.
    pub fn of_collection(&self, collection: &str) -> &[Value] {
        self.collections.get(collection).map(Vec::as_slice).unwrap_or(&[])
    }
}
