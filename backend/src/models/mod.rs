//! Domain models shared by the planner, the remapper and the hosts.
//!
//! - [`Header`] / [`Row`] - Ordered column names and values
//! - [`Selection`] - The columns a user wants to change, or where to add new ones
//!
//! Positional markers are recognised once, in [`Selection::parse`], and carried
//! as enum variants from then on.

use serde::{Deserialize, Serialize};

use crate::error::{ColumnError, ColumnResult};

/// Ordered column names.
pub type Header = Vec<String>;

/// Ordered values, one per header entry.
pub type Row = Vec<String>;

/// Marker text that prepends new columns (quotes included).
pub const PREPEND_MARKER: &str = "\"<\"";

/// Marker text that appends new columns (quotes included).
pub const APPEND_MARKER: &str = "\">\"";

const INSERT_PREFIX: &str = "\">";
const INSERT_SUFFIX: &str = "<\"";

// =============================================================================
// Selection
// =============================================================================

/// The columns selected for a transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Selection {
    /// Literal column names, matched against the header by name.
    Columns(Vec<String>),
    /// New columns go before the first column.
    Prepend,
    /// New columns go after the last column.
    Append,
    /// New columns go before the column currently at this index.
    InsertBefore(usize),
}

impl Selection {
    /// Parse a comma-separated selection as typed by a user.
    ///
    /// ```
    /// use colscript::Selection;
    ///
    /// assert_eq!(Selection::parse(r#"">""#).unwrap(), Selection::Append);
    /// assert_eq!(Selection::parse(r#"">2<""#).unwrap(), Selection::InsertBefore(2));
    /// assert_eq!(
    ///     Selection::parse("first, last").unwrap(),
    ///     Selection::Columns(vec!["first".into(), "last".into()])
    /// );
    /// ```
    pub fn parse(text: &str) -> ColumnResult<Self> {
        Self::from_entries(text.split(','))
    }

    /// Build a selection from already separated entries.
    ///
    /// A single entry is checked against the marker grammar; anything else is
    /// a list of column names. Blank entries are ignored.
    pub fn from_entries<I, S>(entries: I) -> ColumnResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = entries
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        match names.len() {
            0 => Err(ColumnError::InvalidSelection),
            1 => Self::parse_marker(&names[0]).unwrap_or(Ok(Selection::Columns(names))),
            _ => Ok(Selection::Columns(names)),
        }
    }

    /// Returns `None` when `entry` is not a marker at all.
    fn parse_marker(entry: &str) -> Option<ColumnResult<Self>> {
        if entry == PREPEND_MARKER {
            return Some(Ok(Selection::Prepend));
        }
        if entry == APPEND_MARKER {
            return Some(Ok(Selection::Append));
        }
        let inner = entry
            .strip_prefix(INSERT_PREFIX)?
            .strip_suffix(INSERT_SUFFIX)?;
        Some(
            inner
                .trim()
                .parse::<usize>()
                .map(Selection::InsertBefore)
                .map_err(|e| ColumnError::InvalidIndexMarker {
                    marker: entry.to_string(),
                    reason: e.to_string(),
                }),
        )
    }

    /// Whether this selection adds columns without consuming any.
    pub fn is_positional(&self) -> bool {
        !matches!(self, Selection::Columns(_))
    }

    /// Column names to look up in the header.
    ///
    /// Positional selections have no names.
    pub fn column_names(&self) -> &[String] {
        match self {
            Selection::Columns(names) => names,
            _ => &[],
        }
    }

    /// Values handed to the script's header mapping.
    ///
    /// The selected names, or the marker text as typed for a positional
    /// selection so a script can tell prepend, append and insert apart.
    pub fn header_input(&self) -> Vec<String> {
        match self {
            Selection::Columns(names) => names.clone(),
            _ => vec![self.to_text()],
        }
    }

    /// Render the selection back into the text a user would type.
    pub fn to_text(&self) -> String {
        match self {
            Selection::Columns(names) => names.join(", "),
            Selection::Prepend => PREPEND_MARKER.to_string(),
            Selection::Append => APPEND_MARKER.to_string(),
            Selection::InsertBefore(index) => {
                format!("{}{}{}", INSERT_PREFIX, index, INSERT_SUFFIX)
            }
        }
    }
}

impl std::str::FromStr for Selection {
    type Err = ColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selection::parse(s)
    }
}
