use crate::ast::filter::FilterSpec;
use crate::error::CompileError;

/// Traversal direction over graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalDirection {
    Outbound,
    Inbound,
    #[default]
    Any,
}

impl TraversalDirection {
    pub fn parse(raw: &str) -> Result<Self, CompileError> {
        match raw.trim().to_lowercase().as_str() {
            "out" | "outbound" => Ok(TraversalDirection::Outbound),
            "in" | "inbound" => Ok(TraversalDirection::Inbound),
            "any" => Ok(TraversalDirection::Any),
            _ => Err(CompileError::InvalidSpec(format!(
                "unknown traversal direction '{raw}'"
            ))),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            TraversalDirection::Outbound => "OUTBOUND",
            TraversalDirection::Inbound => "INBOUND",
            TraversalDirection::Any => "ANY",
        }
    }
}

/// Traversal depth: a single hop count or an inclusive `(min, max)` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Exact(u32),
    Range(u32, u32),
}

impl Default for Depth {
    fn default() -> Self {
        Depth::Exact(1)
    }
}

impl Depth {
    /// Normalized `(min, max)` bounds.
    pub fn bounds(self) -> (u32, u32) {
        match self {
            Depth::Exact(n) => (n, n),
            Depth::Range(min, max) => (min, max),
        }
    }
}

/// One hop of a graph traversal.
///
/// The start point is resolved from exactly one of three sources: an
/// explicit [`start_vertex`](Self::start_vertex), the parent hop's edge
/// target (when the node appears in a parent's `joins`), or — with neither
/// of those but a [`kind`](Self::kind) present — a preliminary scan over
/// the edge collection by kind, the only mode allowing an ownerless broad
/// search. A node with none of the three fails to compile.
///
/// # Examples
///
/// ```
/// use xql_lang::TraversalNode;
///
/// let hop = TraversalNode::new("edges")
///     .kind("orgs:projects")
///     .depth_range(1, 2)
///     .join(TraversalNode::chained().kind("projects:tasks"));
/// assert_eq!(hop.joins.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraversalNode {
    /// Edge collection to walk; a join hop inherits its parent's when unset.
    pub edge_collection: Option<String>,
    /// Edge kind tag; filters hops to edges of this kind.
    pub kind: Option<String>,
    /// Explicit start vertex id (`collection/key`).
    pub start_vertex: Option<String>,
    pub direction: TraversalDirection,
    pub depth: Depth,
    pub edge_filters: FilterSpec,
    pub node_filters: FilterSpec,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub joins: Vec<TraversalNode>,
}

impl TraversalNode {
    pub fn new(edge_collection: impl Into<String>) -> Self {
        TraversalNode {
            edge_collection: Some(edge_collection.into()),
            ..TraversalNode::default()
        }
    }

    /// A hop that chains from its parent's traversed edge, inheriting the
    /// parent's edge collection.
    pub fn chained() -> Self {
        TraversalNode::default()
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn start_vertex(mut self, vertex: impl Into<String>) -> Self {
        self.start_vertex = Some(vertex.into());
        self
    }

    pub fn direction(mut self, direction: TraversalDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn depth(mut self, hops: u32) -> Self {
        self.depth = Depth::Exact(hops);
        self
    }

    pub fn depth_range(mut self, min: u32, max: u32) -> Self {
        self.depth = Depth::Range(min, max);
        self
    }

    pub fn edge_filters(mut self, filters: FilterSpec) -> Self {
        self.edge_filters = filters;
        self
    }

    pub fn node_filters(mut self, filters: FilterSpec) -> Self {
        self.node_filters = filters;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn join(mut self, node: TraversalNode) -> Self {
        self.joins.push(node);
        self
    }

    /// Parse the JSON mapping form (keys case-insensitive).
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CompileError> {
        let map = json
            .as_object()
            .ok_or_else(|| CompileError::InvalidSpec("traversal must be an object".to_string()))?;

        let get = |name: &str| crate::ast::node::spec_key(map, name);

        let mut node = TraversalNode::chained();
        node.edge_collection = get("EDGE_COLLECTION")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        node.kind = get("KIND").and_then(|v| v.as_str()).map(str::to_string);
        node.start_vertex = get("START_VERTEX")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if let Some(direction) = get("DIRECTION").and_then(|v| v.as_str()) {
            node.direction = TraversalDirection::parse(direction)?;
        }
        if let Some(depth) = get("DEPTH") {
            node.depth = parse_depth(depth)?;
        }
        if let Some(filters) = get("EDGE_FILTERS").filter(|v| !v.is_null()) {
            node.edge_filters = FilterSpec::from_json(filters)?;
        }
        if let Some(filters) = get("NODE_FILTERS").filter(|v| !v.is_null()) {
            node.node_filters = FilterSpec::from_json(filters)?;
        }
        node.limit = get("LIMIT").and_then(|v| v.as_u64());
        node.offset = get("OFFSET").and_then(|v| v.as_u64());
        if let Some(joins) = get("JOINS") {
            let items = joins.as_array().ok_or_else(|| {
                CompileError::InvalidSpec("JOINS must be an array of traversals".to_string())
            })?;
            node.joins = items
                .iter()
                .map(TraversalNode::from_json)
                .collect::<Result<_, _>>()?;
        }

        Ok(node)
    }
}

fn parse_depth(json: &serde_json::Value) -> Result<Depth, CompileError> {
    match json {
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(|d| Depth::Exact(d as u32))
            .ok_or_else(|| CompileError::InvalidSpec(format!("invalid depth {n}"))),
        serde_json::Value::Array(pair) => match pair.as_slice() {
            [min, max] => {
                let (Some(min), Some(max)) = (min.as_u64(), max.as_u64()) else {
                    return Err(CompileError::InvalidSpec(
                        "depth bounds must be integers".to_string(),
                    ));
                };
                Ok(Depth::Range(min as u32, max as u32))
            }
            _ => Err(CompileError::InvalidSpec(
                "depth range must have two bounds".to_string(),
            )),
        },
        other => Err(CompileError::InvalidSpec(format!("invalid depth {other}"))),
    }
}
