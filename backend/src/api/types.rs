//! REST API types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::PipelineResult;
use crate::models::Row;
use crate::parser::format_delimiter;
use crate::transform::pipeline::TransformOutput;

/// Response sent after a CSV upload was transformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    /// Unique job identifier, also used in logs
    pub job_id: String,

    /// "ready", or "warning" when selected columns were missing
    pub status: String,

    pub header: Vec<String>,
    pub rows: Vec<Row>,

    /// The output rendered with the input's delimiter
    pub csv: String,

    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub row_count: usize,
    /// Registry id when a stored script was used
    pub script_id: Option<String>,
    pub missing_columns: Vec<String>,
    pub csv_info: CsvMetadata,
}

/// Input file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl TransformResponse {
    pub fn new(
        job_id: Uuid,
        output: TransformOutput,
        script_id: Option<String>,
    ) -> PipelineResult<Self> {
        let csv = output.to_csv()?;
        let status = if output.missing_columns.is_empty() {
            "ready"
        } else {
            "warning"
        };

        Ok(Self {
            job_id: job_id.to_string(),
            status: status.to_string(),
            header: output.header,
            rows: output.rows,
            csv,
            metadata: ResponseMetadata {
                row_count: output.row_count,
                script_id,
                missing_columns: output.missing_columns,
                csv_info: CsvMetadata {
                    encoding: output.csv_info.encoding,
                    delimiter: format_delimiter(output.csv_info.delimiter),
                    row_count: output.csv_info.row_count,
                    columns: output.csv_info.headers,
                },
            },
        })
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "header": [],
        "rows": [],
    })
}
