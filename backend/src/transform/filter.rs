//! Row filter and category rename.
//!
//! Rows are excluded when their category label contains any configured
//! substring (case-sensitive). Exclusions form a set, so the order in
//! which they are applied never changes the surviving rows.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::models::{RawTable, TidyTable};

/// Maps a raw category header to its display name.
pub type RenameMap = HashMap<String, String>;

/// Exclusion predicate over category labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    exclusions: BTreeSet<String>,
}

impl RowFilter {
    /// Build a filter from exclusion substrings. Empty substrings are ignored
    /// (they would match every label).
    pub fn new<I, S>(exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclusions: exclusions
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    /// Whether a label contains any exclusion substring
    pub fn excludes(&self, label: &str) -> bool {
        self.exclusions.iter().any(|s| label.contains(s.as_str()))
    }

    pub fn keeps(&self, label: &str) -> bool {
        !self.excludes(label)
    }

    pub fn exclusions(&self) -> impl Iterator<Item = &str> {
        self.exclusions.iter().map(String::as_str)
    }
}

/// Rename the category column if the rename map has an entry for it.
pub fn rename_category(mut table: RawTable, renames: &RenameMap) -> RawTable {
    if let Some(name) = renames.get(&table.category_column) {
        table.category_column = name.clone();
    }
    table
}

/// Drop excluded rows, preserving the order of the rest.
pub fn filter_rows(mut table: RawTable, filter: &RowFilter) -> RawTable {
    let before = table.rows.len();
    table.rows.retain(|row| filter.keeps(&row.category));
    debug!(
        kept = table.rows.len(),
        dropped = before - table.rows.len(),
        "filtered category rows"
    );
    table
}

/// Rename the category column, then drop excluded rows.
pub fn filter_and_rename(table: RawTable, renames: &RenameMap, filter: &RowFilter) -> RawTable {
    filter_rows(rename_category(table, renames), filter)
}

/// Apply the same exclusion to long-form records.
pub fn filter_records(table: &TidyTable, filter: &RowFilter) -> TidyTable {
    table
        .iter()
        .filter(|r| filter.keeps(&r.category))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRow;

    fn table(labels: &[&str]) -> RawTable {
        RawTable {
            category_column: "Ethnicity, race, and citizenship status".into(),
            years: vec![2016, 2017],
            rows: labels
                .iter()
                .map(|l| RawRow {
                    category: l.to_string(),
                    values: vec![Some(1), Some(2)],
                })
                .collect(),
        }
    }

    fn labels(table: &RawTable) -> Vec<&str> {
        table.categories().collect()
    }

    #[test]
    fn test_excludes_by_substring() {
        let filter = RowFilter::new(["citizen", "visa", "Not"]);
        let out = filter_rows(
            table(&[
                "All doctorate recipients",
                "U.S. citizen or permanent resident",
                "Temporary visa holder",
                "Not Hispanic or Latino",
                "Asian",
            ]),
            &filter,
        );
        assert_eq!(labels(&out), vec!["All doctorate recipients", "Asian"]);
    }

    #[test]
    fn test_case_sensitive() {
        let filter = RowFilter::new(["not"]);
        let out = filter_rows(table(&["Not reported"]), &filter);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_no_match_is_unchanged() {
        let original = table(&["A", "B"]);
        let out = filter_rows(original.clone(), &RowFilter::new(["zzz"]));
        assert_eq!(out, original);
    }

    #[test]
    fn test_everything_excluded() {
        let out = filter_rows(
            table(&["Hispanic", "Hispanic or Latino"]),
            &RowFilter::new(["Hispanic"]),
        );
        assert!(out.is_empty());
        assert_eq!(out.years, vec![2016, 2017]);
    }

    #[test]
    fn test_order_of_exclusions_irrelevant() {
        let rows = ["A citizen", "B visa", "C", "Not D", "E"];
        let a = filter_rows(table(&rows), &RowFilter::new(["citizen", "visa", "Not"]));
        let b = filter_rows(table(&rows), &RowFilter::new(["Not", "citizen", "visa"]));
        let visa = filter_rows(table(&rows), &RowFilter::new(["visa"]));
        let not = filter_rows(visa, &RowFilter::new(["Not"]));
        let c = filter_rows(not, &RowFilter::new(["citizen"]));
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_empty_exclusion_ignored() {
        let filter = RowFilter::new(["", "visa"]);
        assert_eq!(filter.exclusions().collect::<Vec<_>>(), vec!["visa"]);
        assert!(filter.keeps("Asian"));
    }

    #[test]
    fn test_rename() {
        let mut renames = RenameMap::new();
        renames.insert(
            "Ethnicity, race, and citizenship status".into(),
            "Race_Ethnicity".into(),
        );
        let out = filter_and_rename(table(&["A"]), &renames, &RowFilter::default());
        assert_eq!(out.category_column, "Race_Ethnicity");

        let untouched = rename_category(out.clone(), &RenameMap::new());
        assert_eq!(untouched.category_column, "Race_Ethnicity");
    }
}
