//! Column script definition
//!
//! A script file is JSON with two required entries: `headers` (what the new
//! columns are called) and `columns` (how each new value is computed from the
//! values of the selected columns). Both lists describe the same new columns
//! and must have the same length.

use serde::{Deserialize, Serialize};

use super::operations::{Operation, Patterns};
use crate::error::{ScriptError, ScriptResult};
use crate::models::Selection;

/// A complete column script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptDefinition {
    /// Version of the script format
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Selection the script was written for, used when none is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,

    /// New header values, one per output column
    pub headers: Vec<HeaderSpec>,

    /// New row values, one per output column
    pub columns: Vec<ColumnSpec>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// How one new header value is produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderSpec {
    /// A fixed name
    Literal(String),
    /// Derived from the name of a selected column
    Derived {
        /// Index into the selected column names
        from: usize,
        #[serde(default)]
        operations: Vec<Operation>,
    },
}

/// How one new row value is produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Index into the selected values (mutually exclusive with sources and constant)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<usize>,

    /// Several selected values joined together, empty ones skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<usize>>,

    /// Separator for joining `sources` (default: " ")
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Constant value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<String>,

    /// Ordered list of operations to apply
    #[serde(default)]
    pub operations: Vec<Operation>,

    /// Value used when the result is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

fn default_separator() -> String {
    " ".to_string()
}

impl ScriptDefinition {
    /// Create a script from header and column specs
    pub fn new(headers: Vec<HeaderSpec>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            selection: None,
            headers,
            columns,
        }
    }

    /// Parse a script from JSON string
    pub fn from_json(json: &str) -> ScriptResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> ScriptResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// All operations used by headers and columns
    fn operations(&self) -> impl Iterator<Item = &Operation> {
        let header_ops = self.headers.iter().flat_map(|h| match h {
            HeaderSpec::Literal(_) => [].iter(),
            HeaderSpec::Derived { operations, .. } => operations.iter(),
        });
        header_ops.chain(self.columns.iter().flat_map(|c| c.operations.iter()))
    }

    /// Check the script and compile its patterns.
    pub fn validate(&self) -> ScriptResult<Patterns> {
        if self.headers.len() != self.columns.len() {
            return Err(ScriptError::InvalidScript(format!(
                "script declares {} headers but {} columns",
                self.headers.len(),
                self.columns.len()
            )));
        }

        let mut patterns = Patterns::new();
        for pattern in self.operations().filter_map(Operation::pattern) {
            if patterns.contains_key(pattern) {
                continue;
            }
            let re = regex::Regex::new(pattern).map_err(|e| {
                ScriptError::InvalidScript(format!("bad pattern '{}': {}", pattern, e))
            })?;
            patterns.insert(pattern.to_string(), re);
        }
        Ok(patterns)
    }

    /// Largest selected value index read by any column
    pub fn max_source(&self) -> Option<usize> {
        self.columns.iter().flat_map(ColumnSpec::get_sources).max()
    }
}

impl HeaderSpec {
    pub fn literal(name: impl Into<String>) -> Self {
        HeaderSpec::Literal(name.into())
    }

    pub fn derived(from: usize, operations: Vec<Operation>) -> Self {
        HeaderSpec::Derived { from, operations }
    }
}

impl ColumnSpec {
    fn empty() -> Self {
        Self {
            source: None,
            sources: None,
            separator: default_separator(),
            constant: None,
            operations: Vec::new(),
            default: None,
        }
    }

    /// Create a column from one selected value
    pub fn from_source(source: usize) -> Self {
        Self {
            source: Some(source),
            ..Self::empty()
        }
    }

    /// Create a column joining several selected values
    pub fn from_sources(sources: Vec<usize>, separator: &str) -> Self {
        Self {
            sources: Some(sources),
            separator: separator.to_string(),
            ..Self::empty()
        }
    }

    /// Create a column with a constant value
    pub fn from_constant(value: impl Into<String>) -> Self {
        Self {
            constant: Some(value.into()),
            ..Self::empty()
        }
    }

    /// Add an operation to the chain
    pub fn with_operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Set the default value
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// All selected value indices read by this column
    pub fn get_sources(&self) -> Vec<usize> {
        let mut result = Vec::new();
        if let Some(s) = self.source {
            result.push(s);
        }
        if let Some(ref ss) = self.sources {
            result.extend(ss.iter().copied());
        }
        result
    }
}

/// Example script: split a "Name" column into first and last name
pub fn example_script() -> ScriptDefinition {
    let part = |index| Operation::SplitPart {
        separator: " ".to_string(),
        index,
    };

    ScriptDefinition::new(
        vec![HeaderSpec::literal("First Name"), HeaderSpec::literal("Last Name")],
        vec![
            ColumnSpec::from_source(0)
                .with_operation(Operation::Trim)
                .with_operation(part(0)),
            ColumnSpec::from_source(0)
                .with_operation(Operation::Trim)
                .with_operation(part(1))
                .with_default("-"),
        ],
    )
    .with_description("Split a full name into first and last name")
    .with_selection(Selection::Columns(vec!["Name".to_string()]))
}
