//! # colscript - column-level CSV transformation
//!
//! colscript rewrites selected columns of a table with a user script. A script
//! maps the selected column names to new header values and the selected values
//! of each row to new row values; the columns can be renamed, split, merged,
//! deleted, or new ones prepended, appended or inserted.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│ Plan+Remap  │────▶│  CSV / JSON │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │  (script)   │     │   (sink)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use colscript::{parse_str, run, script_fn, MemoryWriter, Selection};
//!
//! let mut table = parse_str("first,last,age\nAda,Lovelace,36", ',').unwrap();
//! let mut merge = script_fn(vec!["name".into()], |vals| vec![vals.join(" ")]);
//! let mut out = MemoryWriter::new();
//!
//! let selection = Selection::parse("first, last").unwrap();
//! run(&mut table, &selection, &mut merge, &mut out).unwrap();
//!
//! assert_eq!(out.to_csv_string(',').unwrap(), "name,age\nAda Lovelace,36\n");
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Header, Row and Selection
//! - [`parser`] - CSV parsing with auto-detection
//! - [`table`] - Row sources and sinks
//! - [`transform`] - Planning, remapping, JSON scripts, and pipeline
//! - [`cache`] - Stored scripts
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server and logs

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;
pub mod table;

// Transformation
pub mod transform;

// Caching
pub mod cache;

pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ColumnError, ColumnResult, CsvError, CsvResult, PipelineError, PipelineResult,
    RegistryError, RegistryResult, ScriptError, ScriptResult, ServerError, ServerResult, Stage,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Header, Row, Selection, APPEND_MARKER, PREPEND_MARKER};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto,
    parse_bytes_with_delimiter, parse_csv_file_auto, parse_str, to_csv_string, write_csv,
    ParseResult,
};

// =============================================================================
// Re-exports - Tables and sinks
// =============================================================================

pub use table::{CsvReaderTable, CsvSink, MemoryTable, MemoryWriter, Sink, Table};

// =============================================================================
// Re-exports - Core
// =============================================================================

pub use transform::{
    script_fn, ColumnPlan, ColumnScript, FnScript, RowRemapper, ScriptFailure, ScriptOutput,
};

// =============================================================================
// Re-exports - DSL
// =============================================================================

pub use transform::dsl::{
    example_script, operations_description, ColumnSpec, DslScript, HeaderSpec, Operation,
    ScriptDefinition,
};

// =============================================================================
// Re-exports - Registry (Cache)
// =============================================================================

pub use cache::{ScriptRegistry, StoredScript};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    resolve_selection, run, transform_bytes, transform_file, transform_upload, CsvInfo,
    RunSummary, TransformOutput,
};

pub use config::Config;

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
