//! Domain models for the doctorate dashboard pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Sheet`] - A parsed spreadsheet after header skipping
//! - [`RawTable`] - Wide table: one category column, one column per year
//! - [`TidyRecord`] / [`TidyTable`] - Long form, one row per (category, year, gender)
//! - [`WideTable`] - Combined multi-year table with a gender column
//! - [`SummaryRow`] - Min/mean/median/max per gender
//! - [`FieldCount`] / [`FieldByGender`] - Field-of-study chart data
//! - [`Notice`] - Non-fatal banner or empty-state marker

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{SchemaError, SchemaResult};

// =============================================================================
// Gender
// =============================================================================

/// Gender tag attached to every long-form record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Both genders in the fixed concatenation order (female first).
    pub const ALL: [Gender; 2] = [Gender::Female, Gender::Male];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "female" | "f" => Ok(Gender::Female),
            "male" | "m" => Ok(Gender::Male),
            other => Err(format!("unknown gender '{}'", other)),
        }
    }
}

// =============================================================================
// Sheet
// =============================================================================

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    /// Build a cell from raw text, recognising numbers with thousands separators.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        let numeric: String = trimmed.chars().filter(|c| *c != ',').collect();
        match numeric.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    /// Count value, or `None` for the empty marker (blank, text, negative, fractional).
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Cell::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64 => {
                Some(*n as u64)
            }
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Cell rendered as a label. Whole numbers lose their fractional part.
    pub fn as_label(&self) -> String {
        match self {
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

/// A parsed sheet: the real header row and every data row below it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    /// Index of the first header equal to `name` (whitespace-trimmed).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Cell at `(row, col)`, or [`Cell::Empty`] past the row end.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }
}

// =============================================================================
// Raw (wide) table
// =============================================================================

static YEAR_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[a-z]*$").expect("year header pattern is valid"));

/// Parse a header as a year column (`"2008"`, `"2017a"` with a footnote marker).
pub fn parse_year_header(header: &str) -> Option<i32> {
    YEAR_HEADER
        .captures(header.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// One category row of a [`RawTable`]; `values` align with `RawTable::years`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub category: String,
    pub values: Vec<Option<u64>>,
}

/// Wide table: one category column plus one column per year.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub category_column: String,
    pub years: Vec<i32>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Derive a raw table from a sheet, locating the category column by its header.
    ///
    /// Columns that are neither the category nor a year are ignored. Rows
    /// with a blank category label are dropped (spacer and footnote rows).
    pub fn from_sheet(sheet: &Sheet, category_header: &str) -> SchemaResult<Self> {
        let category_idx =
            sheet
                .column_index(category_header)
                .ok_or_else(|| SchemaError::MissingCategoryColumn {
                    expected: category_header.to_string(),
                    found: sheet.headers.clone(),
                })?;

        let year_columns: Vec<(usize, i32)> = sheet
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != category_idx)
            .filter_map(|(i, h)| parse_year_header(h).map(|y| (i, y)))
            .collect();

        if year_columns.is_empty() {
            return Err(SchemaError::NoYearColumns {
                category: category_header.to_string(),
            });
        }

        let rows = (0..sheet.rows.len())
            .filter_map(|r| {
                let category = sheet.cell(r, category_idx).as_label();
                if category.is_empty() {
                    return None;
                }
                let values = year_columns
                    .iter()
                    .map(|(c, _)| sheet.cell(r, *c).as_count())
                    .collect();
                Some(RawRow { category, values })
            })
            .collect();

        Ok(Self {
            category_column: category_header.trim().to_string(),
            years: year_columns.into_iter().map(|(_, y)| y).collect(),
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.category.as_str())
    }
}

// =============================================================================
// Tidy (long) table
// =============================================================================

/// One observation: a category's value for one year and gender.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TidyRecord {
    pub category: String,
    pub year: i32,
    pub gender: Gender,
    pub value: Option<u64>,
}

/// Ordered sequence of [`TidyRecord`]s: source row order, then year order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TidyTable {
    pub records: Vec<TidyRecord>,
}

impl TidyTable {
    pub fn new(records: Vec<TidyRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TidyRecord> {
        self.records.iter()
    }
}

impl FromIterator<TidyRecord> for TidyTable {
    fn from_iter<I: IntoIterator<Item = TidyRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for TidyTable {
    type Item = TidyRecord;
    type IntoIter = std::vec::IntoIter<TidyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a TidyTable {
    type Item = &'a TidyRecord;
    type IntoIter = std::slice::Iter<'a, TidyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// =============================================================================
// Wide table with gender column
// =============================================================================

/// One (gender, category) row of a [`WideTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideRow {
    pub gender: Gender,
    pub category: String,
    pub values: Vec<Option<u64>>,
}

/// Multi-year table with category and gender columns (female rows, then male rows).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WideTable {
    pub years: Vec<i32>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn year_index(&self, year: i32) -> Option<usize> {
        self.years.iter().position(|y| *y == year)
    }

    /// Distinct genders in first-seen order.
    pub fn genders(&self) -> Vec<Gender> {
        let mut out = Vec::new();
        for row in &self.rows {
            if !out.contains(&row.gender) {
                out.push(row.gender);
            }
        }
        out
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for row in &self.rows {
            if !out.iter().any(|c| c == &row.category) {
                out.push(row.category.clone());
            }
        }
        out
    }
}

// =============================================================================
// Summary & field-of-study output
// =============================================================================

/// Summary statistics of one gender's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub gender: Gender,
    /// Number of values the statistics were computed over.
    pub count: usize,
    pub min: u64,
    pub mean: f64,
    pub median: f64,
    pub max: u64,
}

impl SummaryRow {
    /// Zero-valued row shown when a gender has no qualifying records.
    pub fn empty(gender: Gender) -> Self {
        Self {
            gender,
            count: 0,
            min: 0,
            mean: 0.0,
            median: 0.0,
            max: 0,
        }
    }
}

/// Doctorates awarded in one field of study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCount {
    pub field: String,
    pub value: f64,
}

/// Male and female values for one field of study, for stacked bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldByGender {
    pub field: String,
    pub male: f64,
    pub female: f64,
}

// =============================================================================
// Notices
// =============================================================================

/// Kind of non-fatal condition reported to the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Source could not be fetched or read; shown as a banner.
    Fetch,
    /// Source is missing expected columns; dataset shown as empty.
    Schema,
    /// An operation had nothing to work on; empty-state.
    EmptyInput,
}

/// A banner or empty-state marker attached to a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub source: String,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            message: message.into(),
        }
    }
}
