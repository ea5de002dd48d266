pub mod ast;
pub mod compiler;
pub mod cursor;
pub mod error;
pub mod flatten;
pub mod macros;
pub mod matcher;
pub mod traversal;
pub mod value;

pub use ast::{
    AggregateOp, AggregateSpec, Depth, Direction, FieldPath, FilterClause, FilterEntry,
    FilterSpec, Operator, SortField, SortSpec, TraversalDirection, TraversalNode, XqlNode,
};
pub use compiler::{
    BindVars, CompiledQuery, QueryExecutor, compile, compile_with_limit, has_modifier_operations,
};
pub use cursor::{Cursor, FindOptions, Pagination, QueryResult, find};
pub use error::CompileError;
pub use matcher::Matcher;
pub use traversal::{CompiledTraversal, TraversalRow, compile_traversal};
pub use value::Value;
