//! DSL operations on column values.
//!
//! Values are opaque strings; every operation maps a string to a string.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All available string operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Remove leading and trailing whitespace
    Trim,

    /// Convert to uppercase
    Uppercase,

    /// Convert to lowercase
    Lowercase,

    /// Replace using regex pattern
    Replace {
        pattern: String,
        #[serde(default)]
        value: String,
    },

    /// Pad string at start to reach target length
    PadStart {
        length: usize,
        #[serde(default = "default_pad_char")]
        char: String,
    },

    /// Pad string at end to reach target length
    PadEnd {
        length: usize,
        #[serde(default = "default_pad_char")]
        char: String,
    },

    /// Extract year (4 digits) from a date string
    ExtractYear,

    /// Ensure string starts with given prefix
    EnsurePrefix { value: String },

    /// Ensure string ends with given suffix
    EnsureSuffix { value: String },

    /// Map values using a lookup table
    Map {
        mapping: HashMap<String, String>,
        #[serde(default)]
        case_insensitive: bool,
        /// Value to use when no mapping match found (none = keep the input)
        #[serde(default)]
        default_unmapped: Option<String>,
    },

    /// Keep one part of a split string, empty if there is no such part
    SplitPart {
        #[serde(default = "default_split_separator")]
        separator: String,
        index: usize,
    },

    /// Take a character range
    Substring {
        start: usize,
        #[serde(default)]
        length: Option<usize>,
    },

    /// Remove all non-alphanumeric characters
    Alphanumeric,

    /// Remove all non-digit characters
    DigitsOnly,
}

fn default_pad_char() -> String {
    "0".to_string()
}

fn default_split_separator() -> String {
    ",".to_string()
}

/// Compiled patterns of a script, keyed by pattern text.
pub type Patterns = HashMap<String, Regex>;

impl Operation {
    /// Regex pattern used by this operation, if any.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Operation::Replace { pattern, .. } => Some(pattern),
            _ => None,
        }
    }

    /// Apply this operation to a value.
    ///
    /// `patterns` must hold every pattern returned by [`Operation::pattern`];
    /// a missing pattern leaves the value unchanged.
    pub fn apply(&self, value: &str, patterns: &Patterns) -> String {
        match self {
            Operation::Trim => value.trim().to_string(),
            Operation::Uppercase => value.to_uppercase(),
            Operation::Lowercase => value.to_lowercase(),
            Operation::Replace {
                pattern,
                value: replacement,
            } => match patterns.get(pattern) {
                Some(re) => re.replace_all(value, replacement.as_str()).into_owned(),
                None => value.to_string(),
            },
            Operation::PadStart { length, char } => pad(value, *length, char, true),
            Operation::PadEnd { length, char } => pad(value, *length, char, false),
            Operation::ExtractYear => extract_year(value),
            Operation::EnsurePrefix { value: prefix } => {
                if value.starts_with(prefix.as_str()) {
                    value.to_string()
                } else {
                    format!("{}{}", prefix, value)
                }
            }
            Operation::EnsureSuffix { value: suffix } => {
                if value.ends_with(suffix.as_str()) {
                    value.to_string()
                } else {
                    format!("{}{}", value, suffix)
                }
            }
            Operation::Map {
                mapping,
                case_insensitive,
                default_unmapped,
            } => apply_map(value, mapping, *case_insensitive, default_unmapped.as_deref()),
            Operation::SplitPart { separator, index } => value
                .split(separator.as_str())
                .nth(*index)
                .map(|p| p.trim().to_string())
                .unwrap_or_default(),
            Operation::Substring { start, length } => {
                let chars = value.chars().skip(*start);
                match length {
                    Some(l) => chars.take(*l).collect(),
                    None => chars.collect(),
                }
            }
            Operation::Alphanumeric => value.chars().filter(|c| c.is_alphanumeric()).collect(),
            Operation::DigitsOnly => value.chars().filter(|c| c.is_ascii_digit()).collect(),
        }
    }
}

fn pad(value: &str, length: usize, pad_char: &str, at_start: bool) -> String {
    let current = value.chars().count();
    if current >= length {
        return value.to_string();
    }
    let pad = pad_char.chars().next().unwrap_or('0');
    let padding: String = std::iter::repeat(pad).take(length - current).collect();
    if at_start {
        format!("{}{}", padding, value)
    } else {
        format!("{}{}", value, padding)
    }
}

fn extract_year(value: &str) -> String {
    let bytes = value.as_bytes();
    bytes
        .windows(4)
        .position(|w| w.iter().all(u8::is_ascii_digit))
        .map(|i| value[i..i + 4].to_string())
        .unwrap_or_default()
}

fn apply_map(
    value: &str,
    mapping: &HashMap<String, String>,
    case_insensitive: bool,
    default_unmapped: Option<&str>,
) -> String {
    let found = if case_insensitive {
        let key = value.to_lowercase();
        mapping
            .iter()
            .find(|(k, _)| k.to_lowercase() == key)
            .map(|(_, v)| v)
    } else {
        mapping.get(value)
    };

    match (found, default_unmapped) {
        (Some(v), _) => v.clone(),
        (None, Some(d)) => d.to_string(),
        (None, None) => value.to_string(),
    }
}

/// Get a description of all available operations
pub fn operations_description() -> String {
    r#"Available column script operations:

| Operation | Description | Parameters |
|-----------|-------------|------------|
| trim | Remove leading/trailing whitespace | - |
| uppercase | Convert to uppercase | - |
| lowercase | Convert to lowercase | - |
| replace | Regex pattern replacement | pattern: regex, value: replacement |
| pad_start | Pad string at start | length: target length, char: pad character (default "0") |
| pad_end | Pad string at end | length: target length, char: pad character (default "0") |
| extract_year | Extract 4-digit year | - |
| ensure_prefix | Add prefix if not present | value: prefix string |
| ensure_suffix | Add suffix if not present | value: suffix string |
| map | Map values using lookup table | mapping: {source: target}, case_insensitive: bool, default_unmapped: string |
| split_part | Keep one part of a split value | separator (default ","), index: zero-based part |
| substring | Extract substring | start: start index, length: optional length |
| alphanumeric | Keep only alphanumeric chars | - |
| digits_only | Keep only digits | - |

Example operations in JSON:
[
  {"type": "trim"},
  {"type": "replace", "pattern": "[-. ]", "value": ""},
  {"type": "split_part", "separator": " ", "index": 1},
  {"type": "map", "mapping": {"M": "Male", "F": "Female"}, "case_insensitive": true}
]"#
    .to_string()
}
