//! CSV reading and writing with encoding and delimiter auto-detection.
//!
//! Input bytes are decoded (UTF-8, ISO-8859-1 or Windows-1252), the delimiter is
//! guessed from the first line, and the records are read with the `csv` crate
//! into an in-memory table of strings. Values stay opaque strings throughout.

use std::io::Write;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{Header, Row};
use crate::table::MemoryTable;

/// Delimiters tried by [`detect_delimiter`], in order of preference.
pub const DELIMITERS: [char; 4] = [';', ',', '\t', '|'];

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed header and rows
    pub table: MemoryTable,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

impl ParseResult {
    /// Column headers
    pub fn headers(&self) -> &[String] {
        self.table.header_names()
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.table.len()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    let content = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };
    Ok(content)
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &DELIMITERS {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Convert a delimiter character to the byte the `csv` crate expects.
pub fn delimiter_byte(delimiter: char) -> CsvResult<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CsvError::ParseError {
            line: 0,
            message: format!("delimiter '{}' is not a single ASCII character", delimiter),
        })
}

/// Human readable delimiter, `\t` shown as `TAB`.
pub fn format_delimiter(delimiter: char) -> String {
    match delimiter {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

/// Parse CSV text with an explicit delimiter.
///
/// Header names are trimmed, values are kept as written. Rows shorter than the
/// header are padded with empty values, longer rows are truncated. Blank lines
/// are skipped, but a row of empty fields such as `,` is kept.
///
/// # Example
/// ```
/// use colscript::parse_str;
///
/// let table = parse_str("name;age\nAlice;30\nBob", ';').unwrap();
/// assert_eq!(table.header_names(), &["name", "age"]);
/// assert_eq!(table.row(1).unwrap(), &["Bob", ""]);
/// ```
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<MemoryTable> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .flexible(true)
        .from_reader(content.as_bytes());

    let header: Header = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if header.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if is_blank_line(&record, header.len()) {
            continue;
        }
        let mut row: Row = record.iter().take(header.len()).map(str::to_string).collect();
        row.resize(header.len(), String::new());
        rows.push(row);
    }

    Ok(MemoryTable::new(header, rows))
}

/// A line with no delimiter and no content. On a one-column header an empty
/// field is a real value.
fn is_blank_line(record: &csv::StringRecord, width: usize) -> bool {
    match record.len() {
        0 => true,
        1 => width > 1 && record[0].trim().is_empty(),
        _ => false,
    }
}

/// Parse CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let table = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Parse CSV bytes with a known delimiter, still detecting the encoding.
pub fn parse_bytes_with_delimiter(bytes: &[u8], delimiter: char) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let table = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Write a header and rows as CSV.
pub fn write_csv<W: Write>(
    writer: W,
    header: &[String],
    rows: &[Row],
    delimiter: char,
) -> CsvResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .flexible(true)
        .from_writer(writer);

    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Render a header and rows as a CSV string.
pub fn to_csv_string(header: &[String], rows: &[Row], delimiter: char) -> CsvResult<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, header, rows, delimiter)?;
    String::from_utf8(buf).map_err(|e| CsvError::WriteError(e.to_string()))
}
