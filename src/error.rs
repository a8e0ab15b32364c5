//! Error types for the container format engine

use thiserror::Error;

use crate::container::DatasetKind;
use crate::value::ValueKind;

pub type Result<T> = std::result::Result<T, FileError>;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("Type mismatch: requested {requested:?}, stored {stored:?}")]
    TypeMismatch {
        requested: ValueKind,
        stored: ValueKind,
    },

    #[error("Schema locked: dataset '{0}' already committed to a writer")]
    SchemaLocked(String),

    #[error("Unknown dataset: kind {0} not declared in this container")]
    UnknownDataset(u8),

    #[error("Dataset not found: kind {0}")]
    DatasetNotFound(u8),

    #[error("Entry kind mismatch: dataset is {expected:?}, entry is {actual:?}")]
    EntryKindMismatch {
        expected: DatasetKind,
        actual: DatasetKind,
    },

    #[error("Row count exceeded: dataset declared {declared} rows")]
    RowCountExceeded { declared: u32 },

    #[error("Column count mismatch: dataset declares {expected} extra columns, entry carries {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("Index out of bounds: row {index} of {count}")]
    IndexOutOfBounds { index: u32, count: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed header: {0}")]
    MalformedHeader(String),
}

impl FileError {
    /// Stable error code for diagnostic/tool output.
    pub fn code(&self) -> &'static str {
        match self {
            FileError::TypeMismatch { .. } => "TYPE_MISMATCH",
            FileError::SchemaLocked(_) => "SCHEMA_LOCKED",
            FileError::UnknownDataset(_) => "UNKNOWN_DATASET",
            FileError::DatasetNotFound(_) => "DATASET_NOT_FOUND",
            FileError::EntryKindMismatch { .. } => "ENTRY_KIND_MISMATCH",
            FileError::RowCountExceeded { .. } => "ROW_COUNT_EXCEEDED",
            FileError::ColumnCountMismatch { .. } => "COLUMN_COUNT_MISMATCH",
            FileError::IndexOutOfBounds { .. } => "INDEX_OUT_OF_BOUNDS",
            FileError::Io(_) => "IO_ERROR",
            FileError::MalformedHeader(_) => "MALFORMED_HEADER",
        }
    }
}
