//! High-level pipeline API.
//!
//! [`run`] drives one column transformation from a [`Table`] into a [`Sink`].
//! The helpers below parse CSV input first and collect the result in memory.
//!
//! # Example
//!
//! ```
//! use colscript::{run, script_fn, MemoryTable, MemoryWriter, Selection};
//!
//! let mut table = MemoryTable::new(
//!     vec!["a".into(), "b".into(), "c".into()],
//!     vec![vec!["1".into(), "2".into(), "3".into()]],
//! );
//! let mut script = script_fn(vec!["B1".into(), "B2".into()], |vals| {
//!     vec![format!("{}a", vals[0]), format!("{}b", vals[0])]
//! });
//! let mut sink = MemoryWriter::new();
//!
//! run(&mut table, &Selection::parse("b").unwrap(), &mut script, &mut sink).unwrap();
//! assert_eq!(sink.header(), &["a", "B1", "B2", "c"]);
//! assert_eq!(sink.rows()[0], vec!["1", "2a", "2b", "3"]);
//! ```

use std::path::Path;

use serde::Serialize;

use super::dsl::DslScript;
use super::plan::ColumnPlan;
use super::remap::RowRemapper;
use super::script::ColumnScript;
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::error::{ColumnError, PipelineError, PipelineResult};
use crate::models::{Header, Row, Selection};
use crate::parser::{
    format_delimiter, parse_bytes_auto, parse_bytes_with_delimiter, to_csv_string, ParseResult,
};
use crate::table::{MemoryWriter, Sink, Table};

/// What a successful [`run`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Header handed to the sink
    pub header: Header,
    /// Rows handed to the sink
    pub rows: usize,
    pub insertion_index: usize,
    pub replaced_indices: Vec<usize>,
    /// Selected names that are not in the header
    pub missing_columns: Vec<String>,
}

/// Transform `table` and hand the result to `sink`.
///
/// The table is reset, a plan is built from its header, the script's header
/// mapping runs once and its row mapping once per row, in order. Output is
/// staged in memory and only replayed into `sink` once every row succeeded,
/// so a failed run leaves `sink` untouched.
pub fn run<T, S, K>(
    table: &mut T,
    selection: &Selection,
    script: &mut S,
    sink: &mut K,
) -> PipelineResult<RunSummary>
where
    T: Table + ?Sized,
    S: ColumnScript + ?Sized,
    K: Sink + ?Sized,
{
    match stage(table, selection, script) {
        Ok((staged, summary)) => {
            staged.replay_into(sink)?;
            log_success(format!(
                "Wrote {} rows, {} columns",
                summary.rows,
                summary.header.len()
            ));
            Ok(summary)
        }
        Err(e) => {
            log_error(format!("Transform failed, nothing written: {}", e));
            Err(e)
        }
    }
}

fn stage<T, S>(
    table: &mut T,
    selection: &Selection,
    script: &mut S,
) -> PipelineResult<(MemoryWriter, RunSummary)>
where
    T: Table + ?Sized,
    S: ColumnScript + ?Sized,
{
    table.reset()?;
    let plan = ColumnPlan::build(table.header(), selection)?;
    print_plan(&plan);

    let missing_columns: Vec<String> = plan
        .missing_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    if !missing_columns.is_empty() {
        log_warning(format!(
            "Columns not found, ignored: {}",
            missing_columns.join(", ")
        ));
    }

    let (mut remapper, header) = RowRemapper::start(&plan, script)?;
    log_info(format!("New header: {}", header.join(" | ")));

    let mut staged = MemoryWriter::new();
    staged.set_header(header.clone())?;
    for row in table.rows() {
        let row = row?;
        staged.append_row(remapper.remap(&row)?)?;
    }

    let summary = RunSummary {
        header,
        rows: remapper.rows_seen(),
        insertion_index: plan.insertion_index(),
        replaced_indices: plan.replaced_indices().to_vec(),
        missing_columns,
    };
    Ok((staged, summary))
}

fn print_plan(plan: &ColumnPlan) {
    let selection = plan.selection();
    if selection.is_positional() {
        log_info(format!(
            "Inserting new columns at position {} ({})",
            plan.insertion_index(),
            selection.to_text()
        ));
        return;
    }

    log_info(format!(
        "Replacing {} column(s) at position {}:",
        plan.replaced_indices().len(),
        plan.insertion_index()
    ));
    for &i in plan.replaced_indices() {
        log_info_indent(format!("[{:2}] {}", i, plan.old_header()[i]), 1);
    }
}

/// Pick the selection typed by the user, or the one the script was written for.
pub fn resolve_selection(
    columns: Option<&str>,
    script: &DslScript,
) -> PipelineResult<Selection> {
    match columns {
        Some(text) => Ok(Selection::parse(text)?),
        None => script
            .definition()
            .selection
            .clone()
            .ok_or_else(|| ColumnError::InvalidSelection.into()),
    }
}

// =============================================================================
// CSV helpers
// =============================================================================

/// CSV file information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Result of transforming a whole CSV input.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub header: Header,
    pub rows: Vec<Row>,
    /// The input as it was read
    pub csv_info: CsvInfo,
    pub row_count: usize,
    pub missing_columns: Vec<String>,
}

impl TransformOutput {
    /// Render the output with the input's delimiter.
    pub fn to_csv(&self) -> PipelineResult<String> {
        Ok(to_csv_string(&self.header, &self.rows, self.csv_info.delimiter)?)
    }
}

/// Transform CSV bytes.
///
/// Encoding is always detected; the delimiter is detected unless given.
pub fn transform_bytes<S>(
    bytes: &[u8],
    selection: &Selection,
    script: &mut S,
    delimiter: Option<char>,
) -> PipelineResult<TransformOutput>
where
    S: ColumnScript + ?Sized,
{
    log_info("Reading CSV...");
    let parsed = match delimiter {
        Some(d) => parse_bytes_with_delimiter(bytes, d)?,
        None => parse_bytes_auto(bytes)?,
    };
    transform_parsed(parsed, selection, script)
}

/// Transform a CSV file.
pub fn transform_file<P, S>(
    path: P,
    selection: &Selection,
    script: &mut S,
    delimiter: Option<char>,
) -> PipelineResult<TransformOutput>
where
    P: AsRef<Path>,
    S: ColumnScript + ?Sized,
{
    let bytes = std::fs::read(path.as_ref()).map_err(crate::error::CsvError::from)?;
    transform_bytes(&bytes, selection, script, delimiter)
}

/// Transform CSV bytes on a blocking worker thread.
pub async fn transform_upload<S>(
    bytes: Vec<u8>,
    selection: Selection,
    mut script: S,
    delimiter: Option<char>,
) -> PipelineResult<TransformOutput>
where
    S: ColumnScript + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        transform_bytes(&bytes, &selection, &mut script, delimiter)
    })
    .await
    .map_err(|e| PipelineError::Aborted(e.to_string()))?
}

fn transform_parsed<S>(
    parsed: ParseResult,
    selection: &Selection,
    script: &mut S,
) -> PipelineResult<TransformOutput>
where
    S: ColumnScript + ?Sized,
{
    log_success(format!("Encoding: {}", parsed.encoding));
    log_success(format!("Separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!(
        "Read {} rows, {} columns",
        parsed.row_count(),
        parsed.headers().len()
    ));

    let csv_info = CsvInfo {
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
        headers: parsed.table.header_names().to_vec(),
        row_count: parsed.table.len(),
    };

    let mut table = parsed.table;
    let mut sink = MemoryWriter::new();
    let summary = run(&mut table, selection, script, &mut sink)?;
    let (header, rows) = sink.into_parts();

    Ok(TransformOutput {
        header,
        row_count: rows.len(),
        rows,
        csv_info,
        missing_columns: summary.missing_columns,
    })
}
