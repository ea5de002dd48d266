//! # XQL — query specification types
//!
//! This module defines the typed specification tree for the XQL query
//! language: filters, sorts, aggregations, query nodes and graph
//! traversals. Specifications are plain values — building one performs no
//! I/O and holds no state — and every loosely-typed input form (qualifier
//! strings, mapping-form JSON) is resolved into these types eagerly, so a
//! malformed specification fails where it is written, not when it runs.
//!
//! ## Architecture Overview
//!
//! - **[operators]** - the operator catalogue, shared by both backends
//! - **[filter]** - filter specifications and qualifier parsing
//! - **[sort]** - sort specifications and direction normalization
//! - **[node]** - query nodes (source, joins, pagination, projection)
//! - **[traversal]** - graph traversal nodes (direction, depth, hops)
//!
//! ## Core Concepts
//!
//! ### Qualifiers
//!
//! A filter key is a field path with an optional operator suffix:
//!
//! ```text
//! "age:gte"            operator form
//! "city"               bare path, defaults to eq
//! "friends[*].city:in" wildcard-array path
//! ```
//!
//! ### Logical grouping
//!
//! The `$or` key groups alternatives; entries inside each alternative stay
//! conjoined:
//!
//! ```text
//! {"$or": [{"city:eq": "NY"}, {"city:eq": "LA"}]}
//! ```
//!
//! ### Two backends, one vocabulary
//!
//! Each [`operators::Operator`] carries both of its renderings: the remote
//! query-text form and the in-memory predicate. The compiler and the
//! matcher consume the same catalogue.
pub mod filter;
pub mod node;
pub mod operators;
pub mod sort;
pub mod traversal;

pub use filter::{FieldPath, FilterClause, FilterEntry, FilterSpec};
pub use node::{AggregateField, AggregateSpec, XqlNode};
pub use operators::{AggregateOp, AqlForm, Operator};
pub use sort::{Direction, SortField, SortSpec};
pub use traversal::{Depth, TraversalDirection, TraversalNode};
