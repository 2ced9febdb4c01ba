//! Column planning.
//!
//! A [`ColumnPlan`] is computed once per run from the header snapshot and the
//! [`Selection`]. It decides which original columns feed the script, where the
//! script's output lands, and which original columns survive untouched.
//!
//! The plan is stored as a slot layout: one `Keep(i)` per surviving original
//! column and exactly one `Splice` where new values go. Header construction and
//! row construction both walk the same layout, so splicing at the placeholder
//! and splicing past the last column cannot diverge.
//!
//! ```text
//! header      a   b   c   d        selection: b, d
//! slots       K0  S   K2           replaced: [1, 3], insertion: 1
//! new header  a   <script output>  c
//! ```

use std::collections::HashSet;

use crate::error::{ColumnError, ColumnResult};
use crate::models::{Header, Row, Selection};

/// One position of the output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Copy the original value at this index.
    Keep(usize),
    /// Insert the script output here.
    Splice,
}

/// Where a transformation reads from and writes to.
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    selection: Selection,
    old_header: Header,
    insertion_index: usize,
    replaced_indices: Vec<usize>,
    slots: Vec<Slot>,
}

impl ColumnPlan {
    /// Build a plan for `selection` against a snapshot of the current header.
    pub fn build(old_header: &[String], selection: &Selection) -> ColumnResult<Self> {
        let (insertion_index, replaced_indices) = match selection {
            Selection::Prepend => (0, Vec::new()),
            Selection::Append => (old_header.len(), Vec::new()),
            Selection::InsertBefore(index) => {
                if *index > old_header.len() {
                    return Err(ColumnError::InvalidIndexMarker {
                        marker: selection.to_text(),
                        reason: format!(
                            "index {} is past the last column ({} columns)",
                            index,
                            old_header.len()
                        ),
                    });
                }
                (*index, Vec::new())
            }
            Selection::Columns(names) => {
                if names.is_empty() {
                    return Err(ColumnError::InvalidSelection);
                }
                let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
                let replaced: Vec<usize> = old_header
                    .iter()
                    .enumerate()
                    .filter(|(_, name)| wanted.contains(name.as_str()))
                    .map(|(i, _)| i)
                    .collect();
                match replaced.first() {
                    Some(&first) => (first, replaced),
                    None => return Err(ColumnError::ColumnsNotFound(names.clone())),
                }
            }
        };

        let slots = layout(old_header.len(), insertion_index, &replaced_indices);

        Ok(Self {
            selection: selection.clone(),
            old_header: old_header.to_vec(),
            insertion_index,
            replaced_indices,
            slots,
        })
    }

    /// The selection this plan was built from.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Header snapshot the plan was built against.
    pub fn old_header(&self) -> &[String] {
        &self.old_header
    }

    /// Position in the original header where new values are spliced in.
    pub fn insertion_index(&self) -> usize {
        self.insertion_index
    }

    /// Original column indices consumed by the script, left to right.
    pub fn replaced_indices(&self) -> &[usize] {
        &self.replaced_indices
    }

    /// Header skeleton: surviving columns plus the placeholder column that
    /// the script output replaces. Positional selections have no placeholder
    /// and return the original header.
    pub fn base_header(&self) -> Vec<&str> {
        match self.replaced_indices.first() {
            None => self.old_header.iter().map(String::as_str).collect(),
            Some(&first) => self
                .old_header
                .iter()
                .enumerate()
                .filter(|(i, _)| *i == first || !self.replaced_indices.contains(i))
                .map(|(_, name)| name.as_str())
                .collect(),
        }
    }

    /// Selected names that did not match any header column.
    pub fn missing_names(&self) -> Vec<&str> {
        self.selection
            .column_names()
            .iter()
            .filter(|name| !self.old_header.contains(*name))
            .map(String::as_str)
            .collect()
    }

    /// Number of original columns copied through unchanged.
    pub fn kept_width(&self) -> usize {
        self.slots.len() - 1
    }

    /// Width of the output for a script producing `new_width` values.
    pub fn output_width(&self, new_width: usize) -> usize {
        self.kept_width() + new_width
    }

    /// The final header for the given script header output.
    pub fn header(&self, new_header_values: &[String]) -> Header {
        self.splice(&self.old_header, new_header_values)
    }

    /// Values at the replaced indices of `row`, in order.
    ///
    /// `row` must have the width of the header snapshot.
    pub fn gather(&self, row: &[String]) -> Row {
        self.replaced_indices.iter().map(|&i| row[i].clone()).collect()
    }

    /// Lay out `row` with `new_values` spliced in.
    ///
    /// Shared by header and row construction. `original` must have the width
    /// of the header snapshot.
    pub fn splice(&self, original: &[String], new_values: &[String]) -> Row {
        let mut out = Vec::with_capacity(self.output_width(new_values.len()));
        for slot in &self.slots {
            match *slot {
                Slot::Keep(i) => out.push(original[i].clone()),
                Slot::Splice => out.extend_from_slice(new_values),
            }
        }
        out
    }
}

/// Compute the slot layout for a header of `width` columns.
fn layout(width: usize, insertion_index: usize, replaced: &[usize]) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(width + 1 - replaced.len());
    let mut replaced = replaced.iter().peekable();
    for i in 0..width {
        if i == insertion_index {
            slots.push(Slot::Splice);
        }
        if replaced.peek() == Some(&&i) {
            replaced.next();
        } else {
            slots.push(Slot::Keep(i));
        }
    }
    if insertion_index == width {
        slots.push(Slot::Splice);
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Header {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn columns(names: &[&str]) -> Selection {
        Selection::Columns(strings(names))
    }

    #[test]
    fn test_prepend_plan() {
        let h = header(&["a", "b"]);
        let plan = ColumnPlan::build(&h, &Selection::Prepend).unwrap();

        assert_eq!(plan.insertion_index(), 0);
        assert!(plan.replaced_indices().is_empty());
        assert_eq!(plan.base_header(), vec!["a", "b"]);
        assert_eq!(plan.header(&strings(&["x", "y"])), strings(&["x", "y", "a", "b"]));
    }

    #[test]
    fn test_append_plan() {
        let h = header(&["a", "b"]);
        let plan = ColumnPlan::build(&h, &Selection::Append).unwrap();

        assert_eq!(plan.insertion_index(), 2);
        assert_eq!(plan.header(&strings(&["x"])), strings(&["a", "b", "x"]));
        assert_eq!(
            plan.splice(&strings(&["1", "2"]), &strings(&["3"])),
            strings(&["1", "2", "3"])
        );
    }

    #[test]
    fn test_insert_before_plan() {
        let h = header(&["a", "b", "c"]);
        let plan = ColumnPlan::build(&h, &Selection::InsertBefore(1)).unwrap();

        assert_eq!(plan.insertion_index(), 1);
        assert_eq!(plan.header(&strings(&["x"])), strings(&["a", "x", "b", "c"]));
    }

    #[test]
    fn test_insert_at_width_matches_append() {
        let h = header(&["a", "b"]);
        let insert = ColumnPlan::build(&h, &Selection::InsertBefore(2)).unwrap();
        let append = ColumnPlan::build(&h, &Selection::Append).unwrap();

        let new = strings(&["x"]);
        assert_eq!(insert.header(&new), append.header(&new));
    }

    #[test]
    fn test_insert_past_end_rejected() {
        let h = header(&["a", "b"]);
        let err = ColumnPlan::build(&h, &Selection::InsertBefore(3)).unwrap_err();
        assert!(matches!(err, ColumnError::InvalidIndexMarker { .. }));
    }

    #[test]
    fn test_rename_plan() {
        let h = header(&["a", "b", "c"]);
        let plan = ColumnPlan::build(&h, &columns(&["b"])).unwrap();

        assert_eq!(plan.insertion_index(), 1);
        assert_eq!(plan.replaced_indices(), &[1]);
        assert_eq!(plan.base_header(), vec!["a", "b", "c"]);
        assert_eq!(plan.header(&strings(&["B"])), strings(&["a", "B", "c"]));
    }

    #[test]
    fn test_non_contiguous_merge_anchors_at_first() {
        let h = header(&["a", "b", "c", "d"]);
        let plan = ColumnPlan::build(&h, &columns(&["d", "b"])).unwrap();

        // scan order, not selection order
        assert_eq!(plan.replaced_indices(), &[1, 3]);
        assert_eq!(plan.insertion_index(), 1);
        assert_eq!(plan.base_header(), vec!["a", "b", "c"]);
        assert_eq!(plan.header(&strings(&["bd"])), strings(&["a", "bd", "c"]));

        let row = strings(&["1", "2", "3", "4"]);
        assert_eq!(plan.gather(&row), strings(&["2", "4"]));
        assert_eq!(plan.splice(&row, &strings(&["24"])), strings(&["1", "24", "3"]));
    }

    #[test]
    fn test_delete_plan() {
        let h = header(&["a", "b", "c"]);
        let plan = ColumnPlan::build(&h, &columns(&["a", "c"])).unwrap();

        assert_eq!(plan.header(&[]), strings(&["b"]));
        assert_eq!(plan.output_width(0), 1);
        assert_eq!(plan.base_header().len() - 1, plan.kept_width());
    }

    #[test]
    fn test_delete_last_column() {
        let h = header(&["a", "b", "c"]);
        let plan = ColumnPlan::build(&h, &columns(&["c"])).unwrap();

        assert_eq!(plan.insertion_index(), 2);
        assert_eq!(plan.header(&strings(&["c1", "c2"])), strings(&["a", "b", "c1", "c2"]));
        assert_eq!(plan.header(&[]), strings(&["a", "b"]));
    }

    #[test]
    fn test_duplicate_header_names_all_replaced() {
        let h = header(&["x", "a", "x"]);
        let plan = ColumnPlan::build(&h, &columns(&["x"])).unwrap();

        assert_eq!(plan.replaced_indices(), &[0, 2]);
        assert_eq!(plan.header(&strings(&["y"])), strings(&["y", "a"]));
    }

    #[test]
    fn test_columns_not_found() {
        let h = header(&["a", "b"]);
        let err = ColumnPlan::build(&h, &columns(&["z"])).unwrap_err();
        assert_eq!(err, ColumnError::ColumnsNotFound(strings(&["z"])));
    }

    #[test]
    fn test_partial_match_reports_missing() {
        let h = header(&["a", "b"]);
        let plan = ColumnPlan::build(&h, &columns(&["b", "z"])).unwrap();
        assert_eq!(plan.replaced_indices(), &[1]);
        assert_eq!(plan.missing_names(), vec!["z"]);
    }

    #[test]
    fn test_empty_columns_rejected() {
        let h = header(&["a"]);
        let err = ColumnPlan::build(&h, &Selection::Columns(Vec::new())).unwrap_err();
        assert_eq!(err, ColumnError::InvalidSelection);
    }

    #[test]
    fn test_header_length_invariant() {
        let h = header(&["a", "b", "c", "d", "e"]);
        let plan = ColumnPlan::build(&h, &columns(&["b", "c", "e"])).unwrap();
        for n in 0..4 {
            let new: Vec<String> = (0..n).map(|i| format!("n{}", i)).collect();
            assert_eq!(plan.header(&new).len(), plan.base_header().len() - 1 + n);
        }
    }
}
