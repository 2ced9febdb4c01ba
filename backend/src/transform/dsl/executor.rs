//! DSL Executor
//!
//! Runs a [`ScriptDefinition`] as a [`ColumnScript`]: header specs are applied
//! to the selected column names, column specs to the selected values of each row.

use std::path::Path;

use super::operations::{Operation, Patterns};
use super::script::{ColumnSpec, HeaderSpec, ScriptDefinition};
use crate::error::ScriptResult;
use crate::transform::script::{ColumnScript, ScriptFailure, ScriptOutput};

/// A validated script with its patterns compiled.
#[derive(Debug, Clone)]
pub struct DslScript {
    definition: ScriptDefinition,
    patterns: Patterns,
}

impl DslScript {
    /// Validate a definition and compile its patterns.
    pub fn new(definition: ScriptDefinition) -> ScriptResult<Self> {
        let patterns = definition.validate()?;
        Ok(Self {
            definition,
            patterns,
        })
    }

    /// Parse and validate a JSON script.
    pub fn from_json(json: &str) -> ScriptResult<Self> {
        Self::new(ScriptDefinition::from_json(json)?)
    }

    /// Load a JSON script file.
    pub fn load<P: AsRef<Path>>(path: P) -> ScriptResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn definition(&self) -> &ScriptDefinition {
        &self.definition
    }

    /// Number of values produced for every header and row
    pub fn width(&self) -> usize {
        self.definition.headers.len()
    }

    fn run_operations(&self, value: String, operations: &[Operation]) -> String {
        operations
            .iter()
            .fold(value, |v, op| op.apply(&v, &self.patterns))
    }

    fn header_value(&self, spec: &HeaderSpec, columns: &[String]) -> Result<String, ScriptFailure> {
        match spec {
            HeaderSpec::Literal(name) => Ok(name.clone()),
            HeaderSpec::Derived { from, operations } => {
                let name = columns.get(*from).ok_or_else(|| {
                    format!(
                        "header derives from selected column {} but {} were selected",
                        from,
                        columns.len()
                    )
                })?;
                Ok(self.run_operations(name.clone(), operations))
            }
        }
    }

    fn column_value(&self, spec: &ColumnSpec, values: &[String]) -> Result<String, ScriptFailure> {
        let read = |index: usize| {
            values.get(index).ok_or_else(|| {
                format!(
                    "source {} is out of range, {} values were selected",
                    index,
                    values.len()
                )
            })
        };

        // Initial value: single source, joined sources or constant
        let mut value = if let Some(source) = spec.source {
            read(source)?.clone()
        } else if let Some(sources) = &spec.sources {
            let mut parts = Vec::with_capacity(sources.len());
            for &source in sources {
                let part = read(source)?.trim();
                if !part.is_empty() {
                    parts.push(part);
                }
            }
            parts.join(&spec.separator)
        } else {
            spec.constant.clone().unwrap_or_default()
        };

        if value.trim().is_empty() {
            if let Some(default) = &spec.default {
                value = default.clone();
            }
        }

        let value = self.run_operations(value, &spec.operations);

        // If result is empty after operations, try default again
        match &spec.default {
            Some(default) if value.trim().is_empty() => Ok(default.clone()),
            _ => Ok(value),
        }
    }
}

impl ColumnScript for DslScript {
    fn update_headers(&mut self, columns: &[String]) -> ScriptOutput {
        self.definition
            .headers
            .iter()
            .map(|spec| self.header_value(spec, columns))
            .collect()
    }

    fn update_column(&mut self, values: &[String]) -> ScriptOutput {
        self.definition
            .columns
            .iter()
            .map(|spec| self.column_value(spec, values))
            .collect()
    }
}
