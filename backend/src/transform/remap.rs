//! Row remapping.
//!
//! [`RowRemapper`] applies a [`ColumnScript`] to every row of a table according
//! to a [`ColumnPlan`]. The script is called exactly once per row, in order, and
//! every output row has the width of the new header or the run fails.

use crate::error::{ColumnError, ColumnResult, Stage};
use crate::models::{Header, Row};

use super::plan::ColumnPlan;
use super::script::ColumnScript;

/// Applies the row mapping of a script under a plan.
pub struct RowRemapper<'a, S: ?Sized> {
    plan: &'a ColumnPlan,
    script: &'a mut S,
    arity: usize,
    rows_seen: usize,
}

impl<'a, S: ColumnScript + ?Sized> RowRemapper<'a, S> {
    /// Call the header mapping and prepare to remap rows.
    ///
    /// Returns the remapper together with the final header. The number of
    /// header values fixes the arity every row mapping must match.
    pub fn start(plan: &'a ColumnPlan, script: &'a mut S) -> ColumnResult<(Self, Header)> {
        let columns = plan.selection().header_input();
        let new_headers = script
            .update_headers(&columns)
            .map_err(|e| ColumnError::TransformFailure {
                stage: Stage::Header,
                message: e.to_string(),
            })?;

        let header = plan.header(&new_headers);
        let remapper = Self {
            plan,
            script,
            arity: new_headers.len(),
            rows_seen: 0,
        };
        Ok((remapper, header))
    }

    /// Number of values the row mapping must return.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Width of every produced row.
    pub fn output_width(&self) -> usize {
        self.plan.output_width(self.arity)
    }

    /// Number of rows remapped so far.
    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }

    /// Remap the next row.
    pub fn remap(&mut self, row: &[String]) -> ColumnResult<Row> {
        let index = self.rows_seen;
        let expected = self.plan.old_header().len();
        if row.len() != expected {
            return Err(ColumnError::RaggedRow {
                row: index,
                expected,
                found: row.len(),
            });
        }

        let old_values = self.plan.gather(row);
        let new_values = self
            .script
            .update_column(&old_values)
            .map_err(|e| ColumnError::TransformFailure {
                stage: Stage::Row(index),
                message: e.to_string(),
            })?;

        if new_values.len() != self.arity {
            return Err(ColumnError::InconsistentArity {
                row: index,
                expected: self.arity,
                found: new_values.len(),
            });
        }

        self.rows_seen += 1;
        Ok(self.plan.splice(row, &new_values))
    }

    /// Lazily remap `rows`. Iteration stops after the first error.
    pub fn apply<I>(self, rows: I) -> Remapped<'a, S, I::IntoIter>
    where
        I: IntoIterator<Item = Row>,
    {
        Remapped {
            remapper: self,
            rows: rows.into_iter(),
            failed: false,
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for RowRemapper<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowRemapper")
            .field("plan", self.plan)
            .field("arity", &self.arity)
            .field("rows_seen", &self.rows_seen)
            .finish_non_exhaustive()
    }
}

/// Iterator returned by [`RowRemapper::apply`].
pub struct Remapped<'a, S: ?Sized, I> {
    remapper: RowRemapper<'a, S>,
    rows: I,
    failed: bool,
}

impl<S, I> Iterator for Remapped<'_, S, I>
where
    S: ColumnScript + ?Sized,
    I: Iterator<Item = Row>,
{
    type Item = ColumnResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let row = self.rows.next()?;
        let result = self.remapper.remap(&row);
        self.failed = result.is_err();
        Some(result)
    }
}

impl<S, I> std::iter::FusedIterator for Remapped<'_, S, I>
where
    S: ColumnScript + ?Sized,
    I: std::iter::FusedIterator<Item = Row>,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Selection;
    use crate::transform::script::{script_fn, FnScript, ScriptOutput};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn plan(header: &[&str], selection: &str) -> ColumnPlan {
        ColumnPlan::build(&strings(header), &Selection::parse(selection).unwrap()).unwrap()
    }

    #[test]
    fn test_split_one_column_in_two() {
        let plan = plan(&["a", "b", "c"], "b");
        let mut script = script_fn(strings(&["B1", "B2"]), |vals| {
            vec![format!("{}a", vals[0]), format!("{}b", vals[0])]
        });

        let (remapper, header) = RowRemapper::start(&plan, &mut script).unwrap();
        assert_eq!(header, strings(&["a", "B1", "B2", "c"]));

        let rows: Vec<Row> = remapper
            .apply(vec![strings(&["1", "2", "3"])])
            .collect::<ColumnResult<_>>()
            .unwrap();
        assert_eq!(rows, vec![strings(&["1", "2a", "2b", "3"])]);
    }

    #[test]
    fn test_prepend_receives_no_values() {
        let plan = plan(&["a", "b"], "\"<\"");
        let mut seen = Vec::new();
        let mut script = script_fn(strings(&["n"]), |vals| {
            seen.push(vals.len());
            vec!["x".to_string()]
        });

        let (remapper, header) = RowRemapper::start(&plan, &mut script).unwrap();
        assert_eq!(header, strings(&["n", "a", "b"]));
        let rows: Vec<Row> = remapper
            .apply(vec![strings(&["1", "2"]), strings(&["3", "4"])])
            .collect::<ColumnResult<_>>()
            .unwrap();
        assert_eq!(rows[1], strings(&["x", "3", "4"]));
        drop(script);
        assert_eq!(seen, vec![0, 0]);
    }

    #[test]
    fn test_header_mapping_sees_marker() {
        let plan = plan(&["a", "b"], "\">\"");
        let mut script = FnScript::new(
            |cols: &[String]| -> ScriptOutput { Ok(cols.to_vec()) },
            |_: &[String]| -> ScriptOutput { Ok(vec!["x".into()]) },
        );

        let (_, header) = RowRemapper::start(&plan, &mut script).unwrap();
        assert_eq!(header, strings(&["a", "b", "\">\""]));
    }

    #[test]
    fn test_wide_row_rejected() {
        let plan = plan(&["a", "b"], "a");
        let mut script = script_fn(strings(&["a"]), |vals| vals.to_vec());
        let (mut remapper, _) = RowRemapper::start(&plan, &mut script).unwrap();

        let err = remapper.remap(&strings(&["1", "2", "EXTRA"])).unwrap_err();
        assert_eq!(
            err,
            ColumnError::RaggedRow {
                row: 0,
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn test_header_mapping_sees_selected_names() {
        let plan = plan(&["a", "b", "c"], "c, a");
        let mut script = FnScript::new(
            |cols: &[String]| -> ScriptOutput { Ok(vec![cols.join("+")]) },
            |vals: &[String]| -> ScriptOutput { Ok(vec![vals.join("+")]) },
        );

        let (mut remapper, header) = RowRemapper::start(&plan, &mut script).unwrap();
        // names in selection order, values in header order
        assert_eq!(header, strings(&["c+a", "b"]));
        assert_eq!(
            remapper.remap(&strings(&["1", "2", "3"])).unwrap(),
            strings(&["1+3", "2"])
        );
    }

    #[test]
    fn test_inconsistent_arity_stops_iteration() {
        let plan = plan(&["a", "b"], "a");
        let mut calls = 0;
        let mut script = script_fn(strings(&["a"]), |vals| {
            calls += 1;
            if calls == 2 {
                vec![vals[0].clone(), vals[0].clone()]
            } else {
                vec![vals[0].clone()]
            }
        });

        let (remapper, _) = RowRemapper::start(&plan, &mut script).unwrap();
        let results: Vec<_> = remapper
            .apply(vec![
                strings(&["1", "x"]),
                strings(&["2", "y"]),
                strings(&["3", "z"]),
            ])
            .collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1],
            Err(ColumnError::InconsistentArity {
                row: 1,
                expected: 1,
                found: 2
            })
        );
        drop(script);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_row_failure_is_reported_with_row() {
        let plan = plan(&["a"], "a");
        let mut script = FnScript::new(
            |_: &[String]| -> ScriptOutput { Ok(vec!["a".into()]) },
            |vals: &[String]| -> ScriptOutput {
                if vals[0] == "bad" {
                    Err("cannot handle".into())
                } else {
                    Ok(vals.to_vec())
                }
            },
        );

        let (mut remapper, _) = RowRemapper::start(&plan, &mut script).unwrap();
        remapper.remap(&strings(&["ok"])).unwrap();
        let err = remapper.remap(&strings(&["bad"])).unwrap_err();
        assert_eq!(
            err,
            ColumnError::TransformFailure {
                stage: Stage::Row(1),
                message: "cannot handle".into()
            }
        );
    }

    #[test]
    fn test_header_failure() {
        let plan = plan(&["a"], "a");
        let mut script = FnScript::new(
            |_: &[String]| -> ScriptOutput { Err("bad header".into()) },
            |vals: &[String]| -> ScriptOutput { Ok(vals.to_vec()) },
        );
        let err = RowRemapper::start(&plan, &mut script).unwrap_err();
        assert!(matches!(
            err,
            ColumnError::TransformFailure { stage: Stage::Header, .. }
        ));
    }

    #[test]
    fn test_ragged_row() {
        let plan = plan(&["a", "b", "c"], "\">\"");
        let mut script = script_fn(strings(&["d"]), |_| vec!["4".into()]);
        let (mut remapper, _) = RowRemapper::start(&plan, &mut script).unwrap();

        let err = remapper.remap(&strings(&["1", "2"])).unwrap_err();
        assert_eq!(
            err,
            ColumnError::RaggedRow {
                row: 0,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_output_width_matches_header() {
        let plan = plan(&["a", "b", "c", "d"], "b, d");
        let mut script = script_fn(strings(&["bd"]), |vals| vec![vals.concat()]);
        let (mut remapper, header) = RowRemapper::start(&plan, &mut script).unwrap();

        assert_eq!(remapper.output_width(), header.len());
        let row = remapper.remap(&strings(&["1", "2", "3", "4"])).unwrap();
        assert_eq!(row, strings(&["1", "24", "3"]));
        assert_eq!(remapper.rows_seen(), 1);
    }
}
