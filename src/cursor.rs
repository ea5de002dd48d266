//! In-memory sorting and pagination.
//!
//! [`Cursor`] applies a stable multi-key sort and offset/limit windowing
//! to records already filtered by the matcher. The ordering reproduces the
//! document-store convention for heterogeneous data: every value maps to a
//! total-order key before comparison, so numbers, strings, booleans,
//! mappings and sequences always order against each other instead of
//! failing.
//!
//! The multi-key sort runs one pass per sort field in specification order.
//! Each pass carries a section id per record — the equality group formed by
//! the passes before it — as the dominant key, so a later pass can never
//! reorder records across an earlier pass's groups. Descending passes
//! invert the section/position bookkeeping, sort reversed, and restore, so
//! the propagated groups always read in ascending construction order.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::debug;

use crate::ast::filter::FilterSpec;
use crate::ast::node::{offset_from_page, page_from_offset};
use crate::ast::sort::{Direction, SortSpec};
use crate::matcher;
use crate::value::Value;

/// Limit applied when a find call specifies none.
const DEFAULT_FIND_LIMIT: u64 = 1000;

/// A total-order key for one value.
///
/// Variant order is the type tier: empty sequences sort below everything
/// (including null), then unsupported/null values, numbers, strings,
/// mappings, sequences, and booleans on top. Mappings compare as their
/// sorted `(value tier, key, value key)` triples; sequences compare
/// element-wise except directly under an active sort key, where they
/// collapse to their smallest (ascending) or largest (descending) element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum OrderKey {
    EmptySeq,
    Bottom,
    Number(Decimal),
    Text(String),
    Mapping(Vec<(u8, String, OrderKey)>),
    Sequence(Vec<OrderKey>),
    Truth(bool),
}

fn tier(key: &OrderKey) -> u8 {
    match key {
        OrderKey::EmptySeq => 0,
        OrderKey::Bottom => 1,
        OrderKey::Number(_) => 2,
        OrderKey::Text(_) => 3,
        OrderKey::Mapping(_) => 4,
        OrderKey::Sequence(_) => 5,
        OrderKey::Truth(_) => 6,
    }
}

/// Map a value to its order key. `active` is the direction of the sort
/// pass when the value sits directly under the sort field, `None` inside
/// nested structures.
fn order_key(value: &Value, active: Option<Direction>) -> OrderKey {
    match value {
        Value::Null => OrderKey::Bottom,
        Value::Boolean(b) => OrderKey::Truth(*b),
        Value::Integer(n) => Decimal::from_i64(*n)
            .map(OrderKey::Number)
            .unwrap_or(OrderKey::Bottom),
        Value::Float(n) => Decimal::from_f64(*n)
            .map(OrderKey::Number)
            .unwrap_or(OrderKey::Bottom),
        Value::String(s) => OrderKey::Text(s.clone()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            OrderKey::Mapping(
                keys.into_iter()
                    .map(|k| {
                        let inner = order_key(&map[k], None);
                        (tier(&inner), k.clone(), inner)
                    })
                    .collect(),
            )
        }
        Value::Array(items) => {
            if items.is_empty() {
                return OrderKey::EmptySeq;
            }
            let keys: Vec<OrderKey> = items.iter().map(|i| order_key(i, None)).collect();
            match active {
                Some(Direction::Descending) => keys.into_iter().max().unwrap_or(OrderKey::Bottom),
                Some(Direction::Ascending) => keys.into_iter().min().unwrap_or(OrderKey::Bottom),
                None => OrderKey::Sequence(keys),
            }
        }
    }
}

/// Walk a dotted path down a nested record for sorting.
///
/// Single-element arrays stand in for their element on ascending passes;
/// descending passes scan arrays for the first element carrying the key.
/// A miss anywhere yields `None`, which sorts as the bottom tier.
fn lookup_sort_value(record: &Value, path: &str, descending: bool) -> Option<Value> {
    let mut current = record.clone();
    for key in path.split('.') {
        let mut next = None;
        match &current {
            Value::Object(map) => next = map.get(key).cloned(),
            Value::Array(items) => {
                if !descending && items.len() == 1 {
                    if let Value::Object(map) = &items[0] {
                        next = map.get(key).cloned();
                    }
                } else if descending {
                    next = items.iter().find_map(|item| match item {
                        Value::Object(map) => map.get(key).cloned(),
                        _ => None,
                    });
                }
            }
            _ => {}
        }
        current = next?;
    }
    Some(current)
}

/// A sorted, windowed view over a record sequence, with a read position.
///
/// # Examples
///
/// ```
/// use xql_lang::{Cursor, SortSpec, Value};
///
/// let records = vec![
///     Value::from(serde_json::json!({"age": 2})),
///     Value::from(serde_json::json!({"age": 1})),
/// ];
/// let sort = SortSpec::parse_entries(["age:asc"]).unwrap();
/// let cursor = Cursor::with(records, &sort, None, None);
/// assert_eq!(cursor.count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    records: Vec<Value>,
    position: usize,
}

impl Cursor {
    pub fn new(records: Vec<Value>) -> Self {
        Cursor {
            records,
            position: 0,
        }
    }

    /// Build a cursor, sort it and window it in one step.
    pub fn with(
        records: Vec<Value>,
        sort: &SortSpec,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> Self {
        let mut cursor = Cursor::new(records);
        if !sort.is_empty() {
            cursor.sort(sort);
        }
        cursor.paginate(offset, limit);
        cursor
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Value> {
        self.records
    }

    pub fn first(&self) -> Option<&Value> {
        self.records.first()
    }

    pub fn has_next(&self) -> bool {
        self.position < self.records.len()
    }

    /// The record at the read position, advancing it.
    pub fn next_record(&mut self) -> Option<&Value> {
        let record = self.records.get(self.position)?;
        self.position += 1;
        Some(record)
    }

    /// Stable multi-key sort, one pass per field in specification order.
    pub fn sort(&mut self, spec: &SortSpec) -> &mut Self {
        let total = self.records.len();
        let mut pre_sections: Vec<usize> = Vec::new();

        for field in spec.fields() {
            let descending = field.direction == Direction::Descending;

            let mut stack: Vec<(usize, OrderKey, usize)> = self
                .records
                .iter()
                .enumerate()
                .map(|(index, record)| {
                    let key = lookup_sort_value(record, &field.path, descending)
                        .map(|v| order_key(&v, Some(field.direction)))
                        .unwrap_or(OrderKey::Bottom);
                    // inverted bookkeeping keeps descending passes
                    // ascending-by-construction once restored
                    let section = pre_sections.get(index).copied().unwrap_or(0);
                    let section = if descending { total - section } else { section };
                    let position = if descending { total - index } else { index };
                    (section, key, position)
                })
                .collect();

            if descending {
                stack.sort_by(|a, b| b.cmp(a));
            } else {
                stack.sort();
            }

            let mut ordered = Vec::with_capacity(total);
            let mut sections = Vec::with_capacity(total);
            let mut section_id: usize = 0;
            let mut last_key: Option<OrderKey> = None;
            for (_, key, position) in stack {
                let index = if descending { total - position } else { position };
                ordered.push(self.records[index].clone());

                if last_key.is_some() && last_key.as_ref() != Some(&key) {
                    section_id += 1;
                }
                sections.push(section_id);
                last_key = Some(key);
            }

            self.records = ordered;
            pre_sections = sections;
        }

        self.position = 0;
        self
    }

    /// Window the records by offset and limit.
    ///
    /// Slicing only happens when the limit is smaller than the record
    /// count. Windows run `ceil(count/limit)` pages deep: a window-aligned
    /// offset before the final window takes exactly one window, anything
    /// else runs to the end, and an offset past the records degrades to an
    /// empty page rather than an error.
    pub fn paginate(&mut self, offset: Option<u64>, limit: Option<u64>) -> &mut Self {
        let count = self.records.len();
        let Some(limit) = limit.map(|l| l as usize).filter(|l| *l > 0) else {
            return self;
        };
        if count == 0 || limit >= count {
            return self;
        }

        let offset = offset.unwrap_or(0) as usize;
        let pages = count.div_ceil(limit);
        let end = if offset % limit == 0 && offset / limit + 1 < pages {
            offset + limit
        } else {
            count
        };
        self.records = if offset >= count {
            Vec::new()
        } else {
            self.records[offset..end].to_vec()
        };
        self.position = 0;
        self
    }
}

impl IntoIterator for Cursor {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Result-page metadata accompanying an in-memory query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    /// Records on this page.
    pub count: u64,
    /// Records matched in total.
    pub total_count: u64,
    pub total_pages: u64,
    pub has_prev: bool,
    pub prev_page: Option<u64>,
    pub has_next: bool,
    pub next_page: Option<u64>,
}

impl Pagination {
    /// Derive the metadata; the page clamps into `1..=total_pages`.
    pub fn build(total_count: u64, count: u64, page: u64, per_page: u64) -> Self {
        let per_page = if per_page < 1 { 10 } else { per_page };
        let total_pages = total_count.div_ceil(per_page);
        let page = if page < 1 {
            1
        } else if page > total_pages {
            total_pages
        } else {
            page
        };
        let has_prev = page > 1 && page <= total_pages;
        let has_next = page < total_pages;
        Pagination {
            page,
            per_page,
            count,
            total_count,
            total_pages,
            has_prev,
            prev_page: if has_prev { Some(page - 1) } else { None },
            has_next,
            next_page: if has_next { Some(page + 1) } else { None },
        }
    }
}

/// Windowing options for [`find`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub page: Option<u64>,
}

/// A filtered, sorted, windowed record page with its metadata.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub records: Vec<Value>,
    /// Records on this page.
    pub count: usize,
    pub pagination: Pagination,
}

/// Filter, sort and window an in-memory record list.
///
/// # Examples
///
/// ```
/// use xql_lang::{find, FindOptions, FilterSpec, SortSpec, Value};
///
/// let data = vec![
///     Value::from(serde_json::json!({"name": "a", "age": 30})),
///     Value::from(serde_json::json!({"name": "b", "age": 20})),
/// ];
/// let filters = FilterSpec::new().with("age:gte", 18).unwrap();
/// let sort = SortSpec::parse_entries(["age:desc"]).unwrap();
/// let result = find(&data, &filters, &sort, FindOptions::default());
/// assert_eq!(result.count, 2);
/// assert_eq!(result.pagination.total_pages, 1);
/// ```
pub fn find(
    data: &[Value],
    filters: &FilterSpec,
    sort: &SortSpec,
    options: FindOptions,
) -> QueryResult {
    let matched = matcher::query(data, filters);
    let total_count = matched.len() as u64;

    let limit = options.limit.unwrap_or(DEFAULT_FIND_LIMIT);
    let offset = match (options.offset, options.page) {
        (Some(offset), _) => offset,
        (None, Some(page)) => offset_from_page(page, limit),
        (None, None) => 0,
    };
    let page = options
        .page
        .unwrap_or_else(|| page_from_offset(offset, limit));

    let cursor = Cursor::with(matched, sort, Some(offset), Some(limit));
    let count = cursor.count();
    debug!(total_count, count, page, "in-memory find");

    QueryResult {
        records: cursor.into_records(),
        count,
        pagination: Pagination::build(total_count, count as u64, page, limit),
    }
}
