//! Row sources and result sinks.
//!
//! - [`Table`] - A header plus a restartable forward row iterator
//! - [`Sink`] - Receives one header and then rows, in order
//!
//! [`MemoryTable`] and [`MemoryWriter`] keep everything in memory.
//! [`CsvReaderTable`] and [`CsvSink`] stream through the `csv` crate.

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{Header, Row};
use crate::parser::{delimiter_byte, to_csv_string, write_csv};

// =============================================================================
// Traits
// =============================================================================

/// A readable table.
pub trait Table {
    /// Current column names.
    fn header(&self) -> &[String];

    /// Rewind so that [`Table::rows`] starts at the first data row.
    fn reset(&mut self) -> CsvResult<()>;

    /// Forward iterator over the remaining data rows.
    fn rows(&mut self) -> Box<dyn Iterator<Item = CsvResult<Row>> + '_>;
}

/// A destination for transformed rows.
pub trait Sink {
    /// Called exactly once, before any row.
    fn set_header(&mut self, header: Header) -> CsvResult<()>;

    /// Called once per output row, in order.
    fn append_row(&mut self, row: Row) -> CsvResult<()>;
}

// =============================================================================
// In-memory table
// =============================================================================

/// A table held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTable {
    header: Header,
    rows: Vec<Row>,
    cursor: usize,
}

impl MemoryTable {
    pub fn new(header: Header, rows: Vec<Row>) -> Self {
        Self {
            header,
            rows,
            cursor: 0,
        }
    }

    /// Column names.
    pub fn header_names(&self) -> &[String] {
        &self.header
    }

    /// Row by position, ignoring the cursor.
    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// All rows, ignoring the cursor.
    pub fn all_rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `n` rows.
    pub fn preview(&self, n: usize) -> &[Row] {
        &self.rows[..n.min(self.rows.len())]
    }
}

impl Table for MemoryTable {
    fn header(&self) -> &[String] {
        &self.header
    }

    fn reset(&mut self) -> CsvResult<()> {
        self.cursor = 0;
        Ok(())
    }

    fn rows(&mut self) -> Box<dyn Iterator<Item = CsvResult<Row>> + '_> {
        Box::new(std::iter::from_fn(move || {
            let row = self.rows.get(self.cursor)?.clone();
            self.cursor += 1;
            Some(Ok(row))
        }))
    }
}

// =============================================================================
// Streaming CSV table
// =============================================================================

/// A table read lazily from a seekable CSV source.
///
/// Rows are not padded; narrower rows surface as errors downstream.
pub struct CsvReaderTable<R> {
    reader: csv::Reader<R>,
    header: Header,
    start: csv::Position,
}

impl<R: Read + Seek> CsvReaderTable<R> {
    /// Wrap a reader. Headers are read immediately.
    pub fn new(mut reader: csv::Reader<R>) -> CsvResult<Self> {
        let header: Header = reader.headers()?.iter().map(str::to_string).collect();
        if header.is_empty() {
            return Err(CsvError::NoHeaders);
        }
        let start = reader.position().clone();
        Ok(Self {
            reader,
            header,
            start,
        })
    }

    /// Read from any seekable source with the given delimiter.
    pub fn from_reader(source: R, delimiter: char) -> CsvResult<Self> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter_byte(delimiter)?)
            .flexible(true)
            .from_reader(source);
        Self::new(reader)
    }
}

impl<R> std::fmt::Debug for CsvReaderTable<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvReaderTable")
            .field("header", &self.header)
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

impl CsvReaderTable<File> {
    /// Open a UTF-8 CSV file.
    pub fn open<P: AsRef<Path>>(path: P, delimiter: char) -> CsvResult<Self> {
        Self::from_reader(File::open(path)?, delimiter)
    }
}

impl<R: Read + Seek> Table for CsvReaderTable<R> {
    fn header(&self) -> &[String] {
        &self.header
    }

    fn reset(&mut self) -> CsvResult<()> {
        self.reader.seek(self.start.clone())?;
        Ok(())
    }

    fn rows(&mut self) -> Box<dyn Iterator<Item = CsvResult<Row>> + '_> {
        Box::new(self.reader.records().map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(CsvError::from)
        }))
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Collects the output in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryWriter {
    header: Option<Header>,
    rows: Vec<Row>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header set so far, empty if none.
    pub fn header(&self) -> &[String] {
        self.header.as_deref().unwrap_or(&[])
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_parts(self) -> (Header, Vec<Row>) {
        (self.header.unwrap_or_default(), self.rows)
    }

    /// Hand the collected output to another sink.
    pub fn replay_into<S: Sink + ?Sized>(self, sink: &mut S) -> CsvResult<()> {
        let (header, rows) = self.into_parts();
        sink.set_header(header)?;
        for row in rows {
            sink.append_row(row)?;
        }
        Ok(())
    }

    pub fn to_csv_string(&self, delimiter: char) -> CsvResult<String> {
        to_csv_string(self.header(), &self.rows, delimiter)
    }

    /// Write the collected output to a CSV file.
    pub fn save<P: AsRef<Path>>(&self, path: P, delimiter: char) -> CsvResult<()> {
        let file = File::create(path)?;
        write_csv(file, self.header(), &self.rows, delimiter)
    }
}

impl Sink for MemoryWriter {
    fn set_header(&mut self, header: Header) -> CsvResult<()> {
        if self.header.is_some() {
            return Err(CsvError::WriteError("header already set".to_string()));
        }
        self.header = Some(header);
        Ok(())
    }

    fn append_row(&mut self, row: Row) -> CsvResult<()> {
        if self.header.is_none() {
            return Err(CsvError::WriteError("row appended before header".to_string()));
        }
        self.rows.push(row);
        Ok(())
    }
}

/// Streams the output as CSV into a writer.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> std::fmt::Debug for CsvSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink").finish_non_exhaustive()
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W, delimiter: char) -> CsvResult<Self> {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter_byte(delimiter)?)
            .from_writer(writer);
        Ok(Self { writer })
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> CsvResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| CsvError::WriteError(e.to_string()))
    }
}

impl<W: Write> Sink for CsvSink<W> {
    fn set_header(&mut self, header: Header) -> CsvResult<()> {
        self.writer.write_record(&header)?;
        Ok(())
    }

    fn append_row(&mut self, row: Row) -> CsvResult<()> {
        self.writer.write_record(&row)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn collect(table: &mut dyn Table) -> Vec<Row> {
        table.rows().collect::<CsvResult<_>>().unwrap()
    }

    #[test]
    fn test_memory_table_reset() {
        let mut table = MemoryTable::new(
            strings(&["a"]),
            vec![strings(&["1"]), strings(&["2"])],
        );

        assert_eq!(collect(&mut table).len(), 2);
        assert!(collect(&mut table).is_empty());

        table.reset().unwrap();
        assert_eq!(collect(&mut table), vec![strings(&["1"]), strings(&["2"])]);
    }

    #[test]
    fn test_csv_reader_table_reset() {
        let data = "a,b\n1,2\n3,4\n";
        let mut table = CsvReaderTable::from_reader(Cursor::new(data), ',').unwrap();

        assert_eq!(table.header(), &["a", "b"]);
        assert_eq!(collect(&mut table).len(), 2);

        table.reset().unwrap();
        let rows = collect(&mut table);
        assert_eq!(rows, vec![strings(&["1", "2"]), strings(&["3", "4"])]);
    }

    #[test]
    fn test_csv_reader_table_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "x;y\n1;2\n").unwrap();

        let mut table = CsvReaderTable::open(&path, ';').unwrap();
        table.reset().unwrap();
        assert_eq!(collect(&mut table), vec![strings(&["1", "2"])]);
    }

    #[test]
    fn test_memory_writer_order() {
        let mut writer = MemoryWriter::new();
        assert!(writer.append_row(strings(&["1"])).is_err());

        writer.set_header(strings(&["a"])).unwrap();
        writer.append_row(strings(&["1"])).unwrap();
        assert!(writer.set_header(strings(&["b"])).is_err());

        assert_eq!(writer.to_csv_string(',').unwrap(), "a\n1\n");
    }

    #[test]
    fn test_memory_writer_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut writer = MemoryWriter::new();
        writer.set_header(strings(&["a", "b"])).unwrap();
        writer.append_row(strings(&["1", "2"])).unwrap();
        writer.save(&path, ';').unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a;b\n1;2\n");
    }

    #[test]
    fn test_replay_into_csv_sink() {
        let mut writer = MemoryWriter::new();
        writer.set_header(strings(&["a"])).unwrap();
        writer.append_row(strings(&["x y"])).unwrap();

        let mut sink = CsvSink::new(Vec::new(), ',').unwrap();
        writer.replay_into(&mut sink).unwrap();
        let bytes = sink.into_inner().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "a\nx y\n");
    }
}
