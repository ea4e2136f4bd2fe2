//! Spreadsheet parser with format, encoding and delimiter auto-detection.
//!
//! Published tables are xlsx workbooks whose first rows are a title and
//! notes; the real header sits on a later row (row 3, zero-indexed, for
//! the NCSES tables). CSV exports of the same tables are accepted too.
//! Output is a generic [`Sheet`]; no dataset-specific logic here.

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx, XlsxError};
use serde::Serialize;
use std::io::Cursor;
use tracing::debug;

use crate::error::{SheetError, SheetResult};
use crate::models::{Cell, Sheet};

/// Zero-indexed row holding the real column headers in NCSES tables.
pub const DEFAULT_HEADER_ROW: usize = 3;

/// Container format of the source bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    Xlsx,
    Csv,
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed sheet (headers + data rows)
    pub sheet: Sheet,
    /// Detected container format
    pub format: SheetFormat,
    /// Detected text encoding (CSV only)
    pub encoding: Option<String>,
    /// Detected delimiter (CSV only)
    pub delimiter: Option<char>,
}

/// Detect xlsx (a zip container) by its magic bytes; anything else is CSV.
pub fn detect_format(bytes: &[u8]) -> SheetFormat {
    if bytes.starts_with(b"PK\x03\x04") {
        SheetFormat::Xlsx
    } else {
        SheetFormat::Csv
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
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // UTF-8 and unknown charsets: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first `lines` lines.
///
/// Title rows above the header rarely contain separators, so a single
/// line is not enough for these tables.
pub fn detect_delimiter(content: &str, lines: usize) -> char {
    let sample: Vec<&str> = content.lines().take(lines.max(1)).collect();

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count: usize = sample.iter().map(|l| l.matches(sep).count()).sum();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse spreadsheet bytes, auto-detecting xlsx or CSV.
pub fn parse_bytes_auto(bytes: &[u8], header_row: usize) -> SheetResult<ParseResult> {
    match detect_format(bytes) {
        SheetFormat::Xlsx => {
            let sheet = parse_xlsx(bytes, header_row)?;
            Ok(ParseResult {
                sheet,
                format: SheetFormat::Xlsx,
                encoding: None,
                delimiter: None,
            })
        }
        SheetFormat::Csv => {
            let encoding = detect_encoding(bytes);
            let content = decode_content(bytes, &encoding);
            let delimiter = detect_delimiter(&content, header_row + 2);
            let sheet = parse_csv(&content, delimiter, header_row)?;
            Ok(ParseResult {
                sheet,
                format: SheetFormat::Csv,
                encoding: Some(encoding),
                delimiter: Some(delimiter),
            })
        }
    }
}

/// Parse the first worksheet of an xlsx workbook.
pub fn parse_xlsx(bytes: &[u8], header_row: usize) -> SheetResult<Sheet> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e: XlsxError| SheetError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)?
        .map_err(|e| SheetError::Workbook(e.to_string()))?;

    // The range starts at the first used cell; keep absolute row numbering.
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut grid: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(data_to_cell));
        grid.push(cells);
    }

    debug!(rows = grid.len(), "read xlsx worksheet");
    sheet_from_grid(grid, header_row)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::from_text(s),
        Data::Empty | Data::Error(_) => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

/// Parse decoded CSV content with an explicit delimiter.
pub fn parse_csv(content: &str, delimiter: char, header_row: usize) -> SheetResult<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    // The reader never yields blank lines, so rows are placed by the
    // physical line each record starts on.
    let mut grid: Vec<Vec<Cell>> = Vec::new();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record)? {
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(grid.len() + 1);
        while grid.len() + 1 < line {
            grid.push(Vec::new());
        }
        grid.push(record.iter().map(Cell::from_text).collect());
    }

    sheet_from_grid(grid, header_row)
}

/// Split a raw grid into header row and data rows.
///
/// Rows above `header_row` are discarded, blank rows below it are skipped,
/// and every data row is padded or truncated to the header width.
pub fn sheet_from_grid(grid: Vec<Vec<Cell>>, header_row: usize) -> SheetResult<Sheet> {
    if grid.len() <= header_row {
        return Err(SheetError::MissingHeaderRow {
            header_row,
            rows: grid.len(),
        });
    }

    let mut rows = grid.into_iter().skip(header_row);
    let headers: Vec<String> = rows
        .next()
        .unwrap_or_default()
        .iter()
        .map(Cell::as_label)
        .collect();
    let width = headers.len();

    let rows = rows
        .filter(|r| !r.iter().all(Cell::is_empty))
        .map(|mut r| {
            r.resize(width, Cell::Empty);
            r
        })
        .collect();

    Ok(Sheet::new(headers, rows))
}
