/// Errors raised while building or compiling a query specification.
///
/// All of these are caller programming errors and surface eagerly, at
/// specification-parse or compile time — never at execution time, and never
/// silently dropped. The in-memory matcher does not raise any of these:
/// operand/field type mismatches there degrade to "no match" instead,
/// since stored documents are heterogeneous by nature.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// A qualifier named an operator that is not in the catalogue.
    UnknownOperator(String),

    /// A `$`-prefixed filter key other than the supported logic keys.
    UnknownLogicKey(String),

    /// `between` requires exactly a two-element array operand.
    BetweenOperands,

    /// A sort entry that could not be normalized to (field, direction).
    MalformedSort(String),

    /// An operand type the operator cannot accept (e.g. `in` on a
    /// non-array). Raised by the remote compiler only.
    InvalidOperand {
        operator: &'static str,
        expected: &'static str,
    },

    /// A traversal node with no start vertex, no parent hop to chain from,
    /// and no edge kind to scan for.
    MissingStartVertex,

    /// A mapping-form specification with the wrong shape (e.g. `FILTERS`
    /// not an object, `JOIN` not an array).
    InvalidSpec(String),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::UnknownOperator(op) => write!(f, "Unknown filter operator: {}", op),
            CompileError::UnknownLogicKey(key) => {
                write!(f, "Unknown logic operator: {}", key)
            }
            CompileError::BetweenOperands => {
                write!(f, "Operator 'between' requires a two-element array operand")
            }
            CompileError::MalformedSort(entry) => write!(f, "Malformed sort entry: {}", entry),
            CompileError::InvalidOperand { operator, expected } => {
                write!(f, "Operator '{}' requires {}", operator, expected)
            }
            CompileError::MissingStartVertex => write!(
                f,
                "Traversal needs a start vertex, a parent hop, or an edge kind"
            ),
            CompileError::InvalidSpec(msg) => write!(f, "Invalid specification: {}", msg),
        }
    }
}

impl std::error::Error for CompileError {}
