//! JSON column scripts.
//!
//! This module provides:
//! - `script`: Script definition (what a script file contains)
//! - `operations`: Available string operations
//! - `executor`: Run a definition as a [`ColumnScript`](crate::ColumnScript)
//!
//! ## Example
//!
//! ```
//! use colscript::{ColumnScript, DslScript};
//!
//! let mut script = DslScript::from_json(r#"{
//!     "headers": [{"from": 0, "operations": [{"type": "uppercase"}]}],
//!     "columns": [{"source": 0, "operations": [{"type": "trim"}]}]
//! }"#).unwrap();
//!
//! assert_eq!(script.update_headers(&["name".into()]).unwrap(), vec!["NAME"]);
//! assert_eq!(script.update_column(&[" Ada ".into()]).unwrap(), vec!["Ada"]);
//! ```

pub mod executor;
pub mod operations;
pub mod script;

pub use executor::DslScript;
pub use operations::{operations_description, Operation, Patterns};
pub use script::{example_script, ColumnSpec, HeaderSpec, ScriptDefinition};
