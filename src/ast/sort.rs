use crate::error::CompileError;
use crate::value::Value;

/// Sort direction, normalized from `1`/`-1` or `asc`/`desc` (any case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    /// Parse a direction word; `asc`/`desc` case-insensitively.
    pub fn parse(raw: &str) -> Result<Self, CompileError> {
        match raw.trim().to_lowercase().as_str() {
            "asc" => Ok(Direction::Ascending),
            "desc" => Ok(Direction::Descending),
            _ => Err(CompileError::MalformedSort(raw.to_string())),
        }
    }

    /// Parse the numeric form: `1` ascending, `-1` descending.
    pub fn from_signum(n: i64) -> Result<Self, CompileError> {
        match n {
            1 => Ok(Direction::Ascending),
            -1 => Ok(Direction::Descending),
            _ => Err(CompileError::MalformedSort(n.to_string())),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// One sort key: a field path and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub path: String,
    pub direction: Direction,
}

/// An ordered sort specification.
///
/// Accepted entry forms, mirroring what callers have historically passed:
/// a bare field name (`"name"`, ascending), `"name:desc"`, `"name desc"`,
/// or a `(field, ±1)` pair. A whole specification can also be a single
/// string or (compatibility form) a mapping of field to direction.
///
/// # Examples
///
/// ```
/// use xql_lang::{SortSpec, Direction};
///
/// let sort = SortSpec::parse_entries(["age:desc", "name"]).unwrap();
/// assert_eq!(sort.fields().len(), 2);
/// assert_eq!(sort.fields()[0].direction, Direction::Descending);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec {
    fields: Vec<SortField>,
}

impl SortSpec {
    pub fn new() -> Self {
        SortSpec::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    /// Append a sort key.
    pub fn push(&mut self, path: impl Into<String>, direction: Direction) {
        self.fields.push(SortField {
            path: path.into(),
            direction,
        });
    }

    /// Chaining form of [`SortSpec::push`].
    pub fn by(mut self, path: impl Into<String>, direction: Direction) -> Self {
        self.push(path, direction);
        self
    }

    /// Parse a sequence of string entries.
    pub fn parse_entries<S: AsRef<str>>(
        entries: impl IntoIterator<Item = S>,
    ) -> Result<Self, CompileError> {
        let mut spec = SortSpec::new();
        for entry in entries {
            spec.push_entry(entry.as_ref())?;
        }
        Ok(spec)
    }

    /// Parse one `"field"`, `"field:dir"` or `"field dir"` entry.
    pub fn push_entry(&mut self, entry: &str) -> Result<(), CompileError> {
        // collapse extra whitespace first, the forms are loosely typed
        let entry = entry.split_whitespace().collect::<Vec<_>>().join(" ");
        if entry.is_empty() {
            return Ok(());
        }

        if let Some((path, dir)) = entry.split_once(':') {
            self.push(path.trim(), Direction::parse(dir)?);
        } else if let Some((path, dir)) = entry.split_once(' ') {
            self.push(path.trim(), Direction::parse(dir)?);
        } else {
            self.push(entry, Direction::Ascending);
        }
        Ok(())
    }

    /// Parse the JSON form: a single string, an array of strings or
    /// `[field, ±1]` pairs, or a mapping of field to direction.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CompileError> {
        match json {
            serde_json::Value::Null => Ok(SortSpec::new()),
            serde_json::Value::String(s) => {
                let mut spec = SortSpec::new();
                spec.push_entry(s)?;
                Ok(spec)
            }
            serde_json::Value::Array(items) => {
                let mut spec = SortSpec::new();
                for item in items {
                    match item {
                        serde_json::Value::String(s) => spec.push_entry(s)?,
                        serde_json::Value::Array(pair) => spec.push_pair(pair)?,
                        other => {
                            return Err(CompileError::MalformedSort(other.to_string()));
                        }
                    }
                }
                Ok(spec)
            }
            serde_json::Value::Object(map) => {
                let mut spec = SortSpec::new();
                for (path, dir) in map {
                    spec.push(path, direction_value(dir)?);
                }
                Ok(spec)
            }
            other => Err(CompileError::MalformedSort(other.to_string())),
        }
    }

    fn push_pair(&mut self, pair: &[serde_json::Value]) -> Result<(), CompileError> {
        let [field, dir] = pair else {
            return Err(CompileError::MalformedSort(format!(
                "expected a (field, direction) pair, got {} items",
                pair.len()
            )));
        };
        let path = field
            .as_str()
            .ok_or_else(|| CompileError::MalformedSort(field.to_string()))?;
        self.push(path, direction_value(dir)?);
        Ok(())
    }
}

fn direction_value(dir: &serde_json::Value) -> Result<Direction, CompileError> {
    match Value::from(dir) {
        Value::Integer(n) => Direction::from_signum(n),
        Value::String(s) => Direction::parse(&s),
        other => Err(CompileError::MalformedSort(format!("{:?}", other))),
    }
}
