//! The user transform capability.
//!
//! A column script has two entry points: one maps the selected column names to
//! the new header values, the other maps the selected values of one row to the
//! new row values. Hosts resolve and validate scripts; the core only calls them.

use crate::models::Row;

/// Error returned by a failing script callback.
pub type ScriptFailure = Box<dyn std::error::Error + Send + Sync>;

/// Result of one script callback.
pub type ScriptOutput = Result<Vec<String>, ScriptFailure>;

/// A user supplied column transformation.
pub trait ColumnScript {
    /// Called once per run with the selected column names (empty for
    /// positional selections). Returns the new header values, possibly more,
    /// fewer or none.
    fn update_headers(&mut self, columns: &[String]) -> ScriptOutput;

    /// Called once per row with the values of the selected columns. Must
    /// return as many values as [`ColumnScript::update_headers`] did.
    fn update_column(&mut self, values: &[String]) -> ScriptOutput;
}

impl<S: ColumnScript + ?Sized> ColumnScript for Box<S> {
    fn update_headers(&mut self, columns: &[String]) -> ScriptOutput {
        (**self).update_headers(columns)
    }

    fn update_column(&mut self, values: &[String]) -> ScriptOutput {
        (**self).update_column(values)
    }
}

/// A script made of two closures.
///
/// ```
/// use colscript::{ColumnScript, FnScript};
///
/// let mut upper = FnScript::new(
///     |cols: &[String]| Ok(cols.iter().map(|c| c.to_uppercase()).collect()),
///     |vals: &[String]| Ok(vals.iter().map(|v| v.to_uppercase()).collect()),
/// );
/// assert_eq!(upper.update_headers(&["name".into()]).unwrap(), vec!["NAME"]);
/// ```
pub struct FnScript<H, C> {
    headers: H,
    column: C,
}

impl<H, C> FnScript<H, C>
where
    H: FnMut(&[String]) -> ScriptOutput,
    C: FnMut(&[String]) -> ScriptOutput,
{
    pub fn new(headers: H, column: C) -> Self {
        Self { headers, column }
    }
}

impl<H, C> ColumnScript for FnScript<H, C>
where
    H: FnMut(&[String]) -> ScriptOutput,
    C: FnMut(&[String]) -> ScriptOutput,
{
    fn update_headers(&mut self, columns: &[String]) -> ScriptOutput {
        (self.headers)(columns)
    }

    fn update_column(&mut self, values: &[String]) -> ScriptOutput {
        (self.column)(values)
    }
}

/// Fixed header values and a row closure that cannot fail.
pub fn script_fn<F>(headers: Vec<String>, mut column: F) -> impl ColumnScript
where
    F: FnMut(&[String]) -> Row,
{
    FnScript::new(
        move |_: &[String]| -> ScriptOutput { Ok(headers.clone()) },
        move |values: &[String]| -> ScriptOutput { Ok(column(values)) },
    )
}

impl<H, C> std::fmt::Debug for FnScript<H, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnScript").finish_non_exhaustive()
    }
}
