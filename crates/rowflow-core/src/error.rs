//! Error types for graph construction and execution.

use std::io;
use std::path::PathBuf;

use crate::row::Row;
use crate::value::Value;

/// Everything that can go wrong while executing a graph.
///
/// Errors travel downstream inside the row stream; an operator that cannot
/// produce its next row yields the error to its consumer and terminates.
/// Nothing is retried and nothing is swallowed.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// `run` was handed a source map with no entry for a referenced name.
    #[error("unknown source {0:?}")]
    UnknownSource(String),

    /// A join node had no side graph to execute. Cannot happen for graphs
    /// built through the public builder.
    #[error("join node without a side graph")]
    MissingSideGraph,

    #[error("failed to open {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A user-supplied line parser rejected its input.
    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: u64,
        message: String,
    },

    /// I/O failure while writing or reading a sort spill file.
    #[error("sort spill i/o failed")]
    Spill(#[source] io::Error),

    /// A spill record did not round-trip back into a row.
    #[error("corrupt sort spill record")]
    SpillDecode(#[source] serde_json::Error),

    #[error("column {column:?} is missing in {row}")]
    MissingColumn { column: String, row: String },

    #[error("column {column:?}: expected {expected}, found {found} in {row}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
        row: String,
    },

    #[error("division by zero computing {column:?} in {row}")]
    DivisionByZero { column: String, row: String },

    #[error("column {column:?}: invalid datetime {value:?}, expected YYYYMMDDTHHMMSS.ffffff")]
    InvalidDatetime { column: String, value: String },
}

impl FlowError {
    pub fn missing_column(column: &str, row: &Row) -> Self {
        FlowError::MissingColumn {
            column: column.to_owned(),
            row: row.to_string(),
        }
    }

    pub fn type_mismatch(column: &str, expected: &'static str, found: &Value, row: &Row) -> Self {
        FlowError::TypeMismatch {
            column: column.to_owned(),
            expected,
            found: found.kind(),
            row: row.to_string(),
        }
    }

    pub fn division_by_zero(column: &str, row: &Row) -> Self {
        FlowError::DivisionByZero {
            column: column.to_owned(),
            row: row.to_string(),
        }
    }
}
