//! Error types for the colscript pipeline.
//!
//! One enum per layer:
//!
//! - [`CsvError`] - CSV reading, decoding and writing
//! - [`ColumnError`] - Column planning and row remapping
//! - [`ScriptError`] - Script file loading and validation
//! - [`RegistryError`] - Stored script registry
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP host errors
//!
//! `From` conversions let `?` cross layer boundaries.

use std::fmt;

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading or writing CSV data.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or write a file.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode the input bytes.
    #[error("Failed to decode content as {encoding}: {message}")]
    EncodingError { encoding: String, message: String },

    /// Malformed record.
    #[error("Line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Nothing to read.
    #[error("CSV file is empty")]
    EmptyFile,

    /// First record yielded no column names.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// Failed to serialize a record.
    #[error("Failed to write CSV: {0}")]
    WriteError(String),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(io) => CsvError::IoError(io),
            csv::ErrorKind::Utf8 { err, .. } => CsvError::EncodingError {
                encoding: "utf-8".to_string(),
                message: err.to_string(),
            },
            csv::ErrorKind::UnequalLengths { expected_len, len, .. } => CsvError::ParseError {
                line,
                message: format!("expected {} fields, found {}", expected_len, len),
            },
            other => CsvError::ParseError {
                line,
                message: format!("{:?}", other),
            },
        }
    }
}

// =============================================================================
// Column Errors
// =============================================================================

/// Which user callback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The header mapping, called once per run.
    Header,
    /// The row mapping for the given zero-based data row.
    Row(usize),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Header => write!(f, "header"),
            Stage::Row(row) => write!(f, "row {}", row),
        }
    }
}

/// Errors raised while planning or applying a column transformation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ColumnError {
    /// The selection names no columns.
    #[error("Columns string can't be empty")]
    InvalidSelection,

    /// A positional insert marker could not be used.
    #[error("Invalid index string: {marker} ({reason})")]
    InvalidIndexMarker { marker: String, reason: String },

    /// None of the selected names exist in the header.
    #[error("None of the selected columns exist in the header: {}", .0.join(", "))]
    ColumnsNotFound(Vec<String>),

    /// The row mapping returned a width that differs from the header mapping.
    #[error("Row {row}: script returned {found} values, expected {expected}")]
    InconsistentArity {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// An input row does not have the width of the header it was read under.
    #[error("Row {row} has {found} values, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The user script failed.
    #[error("Script failed on {stage}: {message}")]
    TransformFailure { stage: Stage, message: String },
}

// =============================================================================
// Script Errors
// =============================================================================

/// Errors while loading a script definition.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Failed to read the script file.
    #[error("Failed to read script: {0}")]
    IoError(#[from] std::io::Error),

    /// Script is not valid JSON or misses a required entry.
    #[error("Invalid script JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Script parsed but is unusable.
    #[error("Invalid script: {0}")]
    InvalidScript(String),
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors from the stored script registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Script id not present.
    #[error("Script not found: {0}")]
    NotFound(String),

    /// Stored or imported script is unusable.
    #[error("Invalid script: {0}")]
    Script(#[from] ScriptError),

    /// IO error.
    #[error("Registry IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Registry JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error returned by [`crate::transform::pipeline::run`] and the
/// file/bytes helpers built on it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Planning or remapping failed.
    #[error("Column error: {0}")]
    Column(#[from] ColumnError),

    /// Script could not be loaded.
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Registry lookup failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The blocking transform task did not complete.
    #[error("Transform task aborted: {0}")]
    Aborted(String),
}

impl PipelineError {
    /// Whether the failure was caused by the request rather than the host.
    pub fn is_caller_error(&self) -> bool {
        match self {
            PipelineError::Csv(CsvError::IoError(_)) => false,
            PipelineError::Csv(CsvError::WriteError(_)) => false,
            PipelineError::Registry(RegistryError::IoError(_)) => false,
            PipelineError::Script(ScriptError::IoError(_)) => false,
            PipelineError::Aborted(_) => false,
            _ => true,
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for planning and remapping.
pub type ColumnResult<T> = Result<T, ColumnError>;

/// Result type for script loading.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
