//! Field-of-study transform.
//!
//! The field-of-study table is laid out the other way round from the
//! ethnicity tables: characteristics are rows and fields are columns. The
//! bar charts need it transposed, which is a one-row melt over the field
//! columns; the stacked chart pairs the melted Male and Female rows.

use serde::{Deserialize, Serialize};

use super::reshape::{melt_rows, pair_by_key, Melted};
use crate::error::{SchemaError, SchemaResult};
use crate::models::{FieldByGender, FieldCount, Sheet};

/// Where the field-of-study table keeps its labels and gender rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    /// Header of the row-label column
    pub label_column: String,
    /// Substring selecting the gender rows
    pub gender_marker: String,
    /// Exact label of the male row to pair
    pub male_label: String,
    /// Exact label of the female row to pair
    pub female_label: String,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            label_column: "Characteristic".to_string(),
            gender_marker: "ale".to_string(),
            male_label: "Male".to_string(),
            female_label: "Female".to_string(),
        }
    }
}

struct FieldColumns {
    label: usize,
    indices: Vec<usize>,
    names: Vec<String>,
}

fn field_columns(sheet: &Sheet, layout: &FieldLayout) -> SchemaResult<FieldColumns> {
    let label = sheet
        .column_index(&layout.label_column)
        .ok_or_else(|| SchemaError::MissingCategoryColumn {
            expected: layout.label_column.clone(),
            found: sheet.headers.clone(),
        })?;

    let (indices, names) = sheet
        .headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != label && !h.trim().is_empty())
        .map(|(i, h)| (i, h.trim().to_string()))
        .unzip();

    Ok(FieldColumns {
        label,
        indices,
        names,
    })
}

fn melt_row(sheet: &Sheet, row: usize, columns: &FieldColumns) -> Vec<Melted<String, Option<f64>>> {
    let label = sheet.cell(row, columns.label).as_label();
    let values: Vec<Option<f64>> = columns
        .indices
        .iter()
        .map(|c| sheet.cell(row, *c).as_number())
        .collect();
    melt_rows([(label.as_str(), values.as_slice())], columns.names.as_slice())
}

fn find_row(
    sheet: &Sheet,
    columns: &FieldColumns,
    layout: &FieldLayout,
    label: &str,
) -> SchemaResult<usize> {
    (0..sheet.rows.len())
        .filter(|r| {
            sheet
                .cell(*r, columns.label)
                .as_label()
                .contains(layout.gender_marker.as_str())
        })
        .find(|r| sheet.cell(*r, columns.label).as_label() == label)
        .ok_or_else(|| SchemaError::MissingRow {
            column: layout.label_column.clone(),
            label: label.to_string(),
        })
}

/// Transpose the first (all recipients) row into `(field, count)` pairs.
///
/// Fields whose cell is blank or suppressed are left out.
pub fn field_totals(sheet: &Sheet, layout: &FieldLayout) -> SchemaResult<Vec<FieldCount>> {
    let columns = field_columns(sheet, layout)?;
    if sheet.rows.is_empty() {
        return Err(SchemaError::MissingRow {
            column: layout.label_column.clone(),
            label: "all doctorate recipients".to_string(),
        });
    }

    Ok(melt_row(sheet, 0, &columns)
        .into_iter()
        .filter_map(|m| m.value.map(|value| FieldCount { field: m.key, value }))
        .collect())
}

/// Pair the Male and Female rows per field for a stacked bar chart.
pub fn fields_by_gender(sheet: &Sheet, layout: &FieldLayout) -> SchemaResult<Vec<FieldByGender>> {
    let columns = field_columns(sheet, layout)?;
    let male = find_row(sheet, &columns, layout, &layout.male_label)?;
    let female = find_row(sheet, &columns, layout, &layout.female_label)?;

    let male = melt_row(sheet, male, &columns);
    let female = melt_row(sheet, female, &columns);

    Ok(pair_by_key(&male, &female)
        .into_iter()
        .map(|(field, male, female)| FieldByGender {
            field,
            male: male.unwrap_or(0.0),
            female: female.unwrap_or(0.0),
        })
        .collect())
}
