use crate::ast::filter::FilterSpec;
use crate::ast::operators::AggregateOp;
use crate::ast::sort::SortSpec;
use crate::error::CompileError;

/// Hard ceiling on any single query's limit; requested limits clamp to it.
pub const MAX_LIMIT: u64 = 1000;

/// Limit applied when a node specifies none.
pub const DEFAULT_LIMIT: u64 = 10;

/// Loop-variable alias applied when a node specifies none.
pub const DEFAULT_ALIAS: &str = "doc";

/// Bookkeeping fields stripped from every projected document.
pub const DEFAULT_UNSET_KEYS: [&str; 2] = ["_rev", "_old_rev"];

/// One grouped scalar reduction: `alias = OP(source)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateField {
    pub alias: String,
    pub op: AggregateOp,
    /// Reduced field; ignored for counts, which reduce over the literal `1`.
    pub source: Option<String>,
}

/// An aggregation specification, mapping result aliases to reductions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateSpec {
    entries: Vec<AggregateField>,
}

impl AggregateSpec {
    pub fn new() -> Self {
        AggregateSpec::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[AggregateField] {
        &self.entries
    }

    pub fn push(&mut self, alias: impl Into<String>, op: AggregateOp, source: Option<String>) {
        self.entries.push(AggregateField {
            alias: alias.into(),
            op,
            source,
        });
    }

    /// Chaining form of [`AggregateSpec::push`].
    pub fn with(mut self, alias: impl Into<String>, op: AggregateOp, source: Option<String>) -> Self {
        self.push(alias, op, source);
        self
    }

    /// Parse the JSON mapping form: `{"alias:op": "source_field"}`.
    ///
    /// Count reductions take any non-string value in place of a source
    /// field (`{"total:count": true}`). Keys without an operator suffix are
    /// rejected.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CompileError> {
        let map = json.as_object().ok_or_else(|| {
            CompileError::InvalidSpec("aggregations must be an object".to_string())
        })?;

        let mut spec = AggregateSpec::new();
        for (key, raw) in map {
            let Some((alias, op)) = key.split_once(':') else {
                return Err(CompileError::InvalidSpec(format!(
                    "aggregation key '{key}' has no operator suffix"
                )));
            };
            let op = AggregateOp::parse(op)?;
            let source = raw.as_str().map(str::to_string);
            spec.push(alias, op, source);
        }
        Ok(spec)
    }
}

/// One query node: source scan, filters, joins, ordering, pagination and
/// projection. Joins are themselves nodes, compiled as correlated
/// sub-queries; their filters may reference the parent alias through
/// literal-reference values (`"#parent.field"`).
///
/// # Examples
///
/// ```
/// use xql_lang::{XqlNode, FilterSpec};
///
/// let node = XqlNode::new("users")
///     .filters(FilterSpec::new().with("age:gte", 18).unwrap())
///     .limit(25);
/// assert_eq!(node.effective_alias(), "doc");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct XqlNode {
    pub source: String,
    pub alias: Option<String>,
    pub filters: FilterSpec,
    pub sort: SortSpec,
    pub offset: Option<u64>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub joins: Vec<XqlNode>,
    pub aggregations: AggregateSpec,
    /// Final return expression; defaults to the node alias.
    pub projection: Option<String>,
    /// Count all matching documents instead of returning them.
    pub return_count: bool,
    /// Omit the pagination clause entirely.
    pub skip_limit: bool,
    /// Omit the final return, leaving the query open for embedding.
    pub partial: bool,
    /// Extra fields to strip from the projection, on top of the defaults.
    pub unset_keys: Vec<String>,
}

impl XqlNode {
    pub fn new(source: impl Into<String>) -> Self {
        XqlNode {
            source: source.into(),
            alias: None,
            filters: FilterSpec::new(),
            sort: SortSpec::new(),
            offset: None,
            page: None,
            limit: None,
            joins: Vec::new(),
            aggregations: AggregateSpec::new(),
            projection: None,
            return_count: false,
            skip_limit: false,
            partial: false,
            unset_keys: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn filters(mut self, filters: FilterSpec) -> Self {
        self.filters = filters;
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn join(mut self, node: XqlNode) -> Self {
        self.joins.push(node);
        self
    }

    pub fn aggregations(mut self, aggregations: AggregateSpec) -> Self {
        self.aggregations = aggregations;
        self
    }

    pub fn projection(mut self, projection: impl Into<String>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    pub fn return_count(mut self) -> Self {
        self.return_count = true;
        self
    }

    pub fn skip_limit(mut self) -> Self {
        self.skip_limit = true;
        self
    }

    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }

    pub fn unset_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.unset_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn effective_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(DEFAULT_ALIAS)
    }

    /// Resolve `(limit, offset, page)` against the clamping rules.
    ///
    /// An explicit offset wins; otherwise the offset derives from the page
    /// number and the clamped limit. The limit is clamped to `max_limit`
    /// in either case.
    pub fn resolve_paging(&self, max_limit: u64) -> (u64, u64, u64) {
        let limit = match self.limit {
            Some(0) | None => DEFAULT_LIMIT,
            Some(n) => n,
        };
        let page = match self.page {
            Some(0) | None => 1,
            Some(n) => n,
        };
        let limit = limit.min(max_limit);
        let offset = self
            .offset
            .unwrap_or_else(|| offset_from_page(page, limit));
        (limit, offset, page)
    }

    /// Every source collection referenced by the node tree.
    pub fn collections(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_collections(&mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_collections(&self, out: &mut Vec<String>) {
        for join in &self.joins {
            join.collect_collections(out);
        }
        out.push(self.source.clone());
    }

    /// Parse the JSON mapping form.
    ///
    /// Keys are case-insensitive; the historical aliases are honored
    /// (`FETCH` for `FROM`, `AS` for `ALIAS`, `SUBQUERIES` for `JOIN`).
    /// Unrecognized keys are ignored.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CompileError> {
        let map = json
            .as_object()
            .ok_or_else(|| CompileError::InvalidSpec("query must be an object".to_string()))?;

        let get = |name: &str| spec_key(map, name);
        let first_of = |names: &[&str]| names.iter().find_map(|n| spec_key(map, n));

        let source = first_of(&["FROM", "FETCH"])
            .and_then(|v| v.as_str())
            .ok_or_else(|| CompileError::InvalidSpec("missing FROM collection".to_string()))?;

        let mut node = XqlNode::new(source);

        if let Some(alias) = first_of(&["ALIAS", "AS"]).and_then(|v| v.as_str()) {
            node.alias = Some(alias.to_string());
        }
        if let Some(filters) = get("FILTERS").filter(|v| !v.is_null()) {
            node.filters = FilterSpec::from_json(filters)?;
        }
        if let Some(sort) = get("SORT") {
            node.sort = SortSpec::from_json(sort)?;
        }
        node.offset = get("OFFSET").and_then(|v| v.as_u64());
        node.page = get("PAGE").and_then(|v| v.as_u64());
        node.limit = get("LIMIT").and_then(|v| v.as_u64());
        if let Some(joins) = first_of(&["JOIN", "SUBQUERIES"]) {
            let items = joins.as_array().ok_or_else(|| {
                CompileError::InvalidSpec("JOIN must be an array of queries".to_string())
            })?;
            node.joins = items.iter().map(XqlNode::from_json).collect::<Result<_, _>>()?;
        }
        if let Some(aggregations) = get("AGGREGATIONS").filter(|v| !v.is_null()) {
            node.aggregations = AggregateSpec::from_json(aggregations)?;
        }
        if let Some(projection) = get("RETURN").and_then(|v| v.as_str()) {
            node.projection = Some(projection.to_string());
        }
        node.return_count = get("RETURN_COUNT").and_then(|v| v.as_bool()).unwrap_or(false);
        node.skip_limit = get("SKIP_LIMIT").and_then(|v| v.as_bool()).unwrap_or(false);
        node.partial = get("RETURN_PARTIAL_QUERY")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if let Some(keys) = get("UNSET_KEYS").and_then(|v| v.as_array()) {
            node.unset_keys = keys
                .iter()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect();
        }

        Ok(node)
    }
}

/// Case-insensitive key lookup for mapping-form specifications.
pub(crate) fn spec_key<'a>(
    map: &'a serde_json::Map<String, serde_json::Value>,
    name: &str,
) -> Option<&'a serde_json::Value> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

/// Offset for a 1-based page number: `(page - 1) * limit`.
pub fn offset_from_page(page: u64, limit: u64) -> u64 {
    if page < 1 { 0 } else { (page - 1) * limit }
}

/// Page number for an offset; exact multiples of `limit` round-trip.
pub fn page_from_offset(offset: u64, limit: u64) -> u64 {
    if limit == 0 { 1 } else { offset / limit + 1 }
}
