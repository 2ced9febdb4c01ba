//! Transformation module.
//!
//! - `plan`: Where the script reads from and writes to
//! - `remap`: Row-by-row application of a script under a plan
//! - `script`: The column script capability
//! - `dsl`: JSON scripts
//! - `pipeline`: Table to sink runs and CSV helpers

pub mod dsl;
pub mod pipeline;
pub mod plan;
pub mod remap;
pub mod script;

pub use dsl::{
    example_script, operations_description, ColumnSpec, DslScript, HeaderSpec, Operation,
    ScriptDefinition,
};
pub use pipeline::*;
pub use plan::ColumnPlan;
pub use remap::{Remapped, RowRemapper};
pub use script::{script_fn, ColumnScript, FnScript, ScriptFailure, ScriptOutput};
