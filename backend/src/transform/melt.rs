//! Wide-to-long reshape and concatenation of gender series.

use crate::models::{Gender, RawTable, TidyRecord, TidyTable};
use super::reshape::melt_rows;

/// Reshape a raw table into one record per (row, year), tagged with `gender`.
///
/// Pure and order-stable: source row order, then year column order.
pub fn melt(table: &RawTable, gender: Gender) -> TidyTable {
    melt_rows(
        table
            .rows
            .iter()
            .map(|r| (r.category.as_str(), r.values.as_slice())),
        table.years.as_slice(),
    )
    .into_iter()
    .map(|m| TidyRecord {
        category: m.label,
        year: m.key,
        gender,
        value: m.value,
    })
    .collect()
}

/// Concatenate two series, `first` then `second`, without deduplication.
pub fn combine(first: TidyTable, second: TidyTable) -> TidyTable {
    let mut records = first.records;
    records.extend(second.records);
    TidyTable::new(records)
}

/// Concatenate any number of series in iteration order.
pub fn combine_all<I: IntoIterator<Item = TidyTable>>(tables: I) -> TidyTable {
    tables
        .into_iter()
        .fold(TidyTable::default(), combine)
}

/// Records of a single category, order preserved.
pub fn restrict_category(table: &TidyTable, category: &str) -> TidyTable {
    table
        .iter()
        .filter(|r| r.category == category)
        .cloned()
        .collect()
}
