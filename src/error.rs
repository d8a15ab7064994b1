use std::path::PathBuf;

/// Errors raised by the population layer.
#[derive(Debug, thiserror::Error)]
pub enum PopulationError {
    /// The loader for a source could not produce a table.
    #[error("source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    /// No loader is registered under this identifier.
    #[error("unknown source '{0}'")]
    UnknownSource(String),

    /// A boolean mask does not match the population's row count.
    #[error("mask has {actual} entries but the population has {expected} rows")]
    ShapeMismatch { expected: usize, actual: usize },

    /// `summarize` was called with no populations.
    #[error("at least one population is required")]
    EmptyInput,

    #[error("column not found: {0}")]
    UnknownColumn(String),

    #[error("row key not found: {0}")]
    UnknownRowKey(String),

    /// A predicate or calculation used a column of the wrong kind.
    #[error("column '{column}' holds {found} values, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("index {index} is out of range for a population of {len} rows")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("invalid slice: {0}")]
    InvalidSlice(String),

    /// A column's length disagrees with the table's row count.
    #[error("column '{column}' has {actual} values but the table has {expected} rows")]
    InconsistentColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate row key: {0}")]
    DuplicateRowKey(String),

    /// IO failure while managing the local cache directory.
    #[error("cache error at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PopulationError>;
