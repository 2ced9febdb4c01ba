//! End-to-end column transformations through the public API.

use colscript::{
    parse_str, run, script_fn, ColumnError, ColumnScript, DslScript, FnScript, MemoryTable,
    MemoryWriter, PipelineError, Row, ScriptOutput, Selection, Sink,
};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn table(csv: &str) -> MemoryTable {
    parse_str(csv, ',').unwrap()
}

fn transform<S: ColumnScript>(
    csv: &str,
    selection: &str,
    script: &mut S,
) -> Result<MemoryWriter, PipelineError> {
    let mut table = table(csv);
    let mut sink = MemoryWriter::new();
    run(&mut table, &Selection::parse(selection)?, script, &mut sink)?;
    Ok(sink)
}

#[test]
fn rename_single_column() {
    let mut script = FnScript::new(
        |cols: &[String]| -> ScriptOutput { Ok(vec![format!("{}_name", cols[0])]) },
        |vals: &[String]| -> ScriptOutput { Ok(vec![vals[0].to_uppercase()]) },
    );
    let out = transform("id,first,age\n1,ada,36\n2,alan,41\n", "first", &mut script).unwrap();

    assert_eq!(out.header(), &["id", "first_name", "age"]);
    assert_eq!(out.rows(), &[strings(&["1", "ADA", "36"]), strings(&["2", "ALAN", "41"])]);
}

#[test]
fn prepend_shifts_originals() {
    let mut counter = 0;
    let mut script = script_fn(strings(&["n", "tag"]), |vals| {
        assert!(vals.is_empty());
        counter += 1;
        vec![counter.to_string(), "x".to_string()]
    });
    let out = transform("a,b\n1,2\n3,4\n", "\"<\"", &mut script).unwrap();

    assert_eq!(out.header(), &["n", "tag", "a", "b"]);
    assert_eq!(out.rows()[1], strings(&["2", "x", "3", "4"]));
}

#[test]
fn append_adds_at_end() {
    let mut script = script_fn(strings(&["z"]), |_| strings(&["0"]));
    let out = transform("a,b\n1,2\n", "\">\"", &mut script).unwrap();

    assert_eq!(out.header(), &["a", "b", "z"]);
    assert_eq!(out.rows()[0], strings(&["1", "2", "0"]));
}

#[test]
fn insert_before_index() {
    let mut script = script_fn(strings(&["mid"]), |_| strings(&["m"]));
    let out = transform("a,b,c\n1,2,3\n", "\">2<\"", &mut script).unwrap();

    assert_eq!(out.header(), &["a", "b", "mid", "c"]);
    assert_eq!(out.rows()[0], strings(&["1", "2", "m", "3"]));
}

#[test]
fn insert_index_past_end_is_rejected() {
    let mut script = script_fn(strings(&["x"]), |_| strings(&["x"]));
    let err = transform("a,b\n1,2\n", "\">3<\"", &mut script).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Column(ColumnError::InvalidIndexMarker { .. })
    ));
}

#[test]
fn merge_non_contiguous_columns() {
    let mut seen: Vec<Row> = Vec::new();
    let mut script = script_fn(strings(&["bd"]), |vals| {
        seen.push(vals.to_vec());
        vec![vals.join("+")]
    });
    let out = transform("a,b,c,d\n1,2,3,4\n", "b, d", &mut script).unwrap();
    drop(script);

    assert_eq!(out.header(), &["a", "bd", "c"]);
    assert_eq!(out.rows()[0], strings(&["1", "2+4", "3"]));
    assert_eq!(seen, vec![strings(&["2", "4"])]);
}

#[test]
fn delete_selected_columns() {
    let mut script = script_fn(Vec::new(), |_| Vec::new());
    let out = transform("a,b,c\n1,2,3\n", "a, c", &mut script).unwrap();

    assert_eq!(out.header(), &["b"]);
    assert_eq!(out.rows()[0], strings(&["2"]));
}

#[test]
fn inconsistent_arity_fails_and_writes_nothing() {
    let mut script = script_fn(strings(&["x", "y"]), |vals| {
        if vals[0] == "3" {
            strings(&["only one"])
        } else {
            strings(&["p", "q"])
        }
    });
    let mut table = table("a,b\n1,2\n3,4\n5,6\n");
    let mut sink = MemoryWriter::new();

    let err = run(
        &mut table,
        &Selection::parse("a").unwrap(),
        &mut script,
        &mut sink,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Column(ColumnError::InconsistentArity {
            row: 1,
            expected: 2,
            found: 1
        })
    ));
    assert!(sink.header().is_empty());
    assert!(sink.rows().is_empty());
}

#[test]
fn split_scenario() {
    let mut script = script_fn(strings(&["B1", "B2"]), |vals| {
        vec![format!("{}a", vals[0]), format!("{}b", vals[0])]
    });
    let out = transform("a,b,c\n1,2,3\n", "b", &mut script).unwrap();

    assert_eq!(out.header(), &["a", "B1", "B2", "c"]);
    assert_eq!(out.rows(), &[strings(&["1", "2a", "2b", "3"])]);
}

#[test]
fn empty_and_unknown_selections() {
    let mut script = script_fn(strings(&["x"]), |_| strings(&["x"]));

    assert!(matches!(
        Selection::parse(" , "),
        Err(ColumnError::InvalidSelection)
    ));
    assert!(matches!(
        transform("a,b\n1,2\n", "nope", &mut script),
        Err(PipelineError::Column(ColumnError::ColumnsNotFound(_)))
    ));
}

#[test]
fn json_script_end_to_end() {
    let mut script = DslScript::from_json(
        r#"{
            "headers": ["Full Name", {"from": 1, "operations": [{"type": "uppercase"}]}],
            "columns": [
                {"sources": [0, 1], "separator": " "},
                {"source": 1, "operations": [{"type": "uppercase"}]}
            ]
        }"#,
    )
    .unwrap();

    let out = transform(
        "first,last,age\nAda,Lovelace,36\nPlato,,80\n",
        "first, last",
        &mut script,
    )
    .unwrap();

    assert_eq!(out.header(), &["Full Name", "LAST", "age"]);
    assert_eq!(out.rows()[0], strings(&["Ada Lovelace", "LOVELACE", "36"]));
    assert_eq!(out.rows()[1], strings(&["Plato", "", "80"]));
}

/// A sink that refuses rows, to check that failures surface from the sink.
struct FullSink;

impl Sink for FullSink {
    fn set_header(&mut self, _header: Row) -> colscript::CsvResult<()> {
        Ok(())
    }

    fn append_row(&mut self, _row: Row) -> colscript::CsvResult<()> {
        Err(colscript::CsvError::WriteError("disk full".into()))
    }
}

#[test]
fn sink_failure_is_reported() {
    let mut script = script_fn(strings(&["a"]), |vals| vals.to_vec());
    let mut table = table("a\n1\n");

    let err = run(
        &mut table,
        &Selection::parse("a").unwrap(),
        &mut script,
        &mut FullSink,
    )
    .unwrap_err();
    assert!(!err.is_caller_error());
}
