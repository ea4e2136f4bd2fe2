//! Per-gender summary statistics (min, mean, median, max).
//!
//! By default statistics cover the fixed "All doctorate recipients"
//! category regardless of what the sidebar selects, as the published
//! dashboard does. [`SummaryScope::Selection`] computes them over the
//! user's current gender and category selection instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EmptyInputError;
use crate::models::{Gender, SummaryRow, TidyTable};

/// Category the fixed-scope summary and the trend chart are computed over.
pub const ALL_RECIPIENTS: &str = "All doctorate recipients";

/// Which records the summary table is computed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryScope {
    /// One fixed category, both genders, whatever the selection.
    FixedCategory(String),
    /// The selected genders and categories.
    Selection,
}

impl Default for SummaryScope {
    fn default() -> Self {
        SummaryScope::FixedCategory(ALL_RECIPIENTS.to_string())
    }
}

impl FromStr for SummaryScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" | "all" => Ok(SummaryScope::default()),
            "selection" | "selected" => Ok(SummaryScope::Selection),
            other => Err(format!("unknown summary scope '{}' (expected fixed|selection)", other)),
        }
    }
}

impl fmt::Display for SummaryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryScope::FixedCategory(c) => write!(f, "fixed ({})", c),
            SummaryScope::Selection => f.write_str("selection"),
        }
    }
}

/// Statistics over one gender's values.
pub fn summarize_values(gender: Gender, values: &[u64]) -> Result<SummaryRow, EmptyInputError> {
    if values.is_empty() {
        return Err(EmptyInputError::new("summary", gender.as_str()));
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let sum: u128 = sorted.iter().map(|v| *v as u128).sum();
    let median = if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
    };

    Ok(SummaryRow {
        gender,
        count: n,
        min: sorted[0],
        mean: sum as f64 / n as f64,
        median,
        max: sorted[n - 1],
    })
}

/// Statistics per gender over every non-empty value in `table`.
///
/// One entry per requested gender, in order.
pub fn summarize(
    table: &TidyTable,
    genders: &[Gender],
) -> Vec<Result<SummaryRow, EmptyInputError>> {
    genders
        .iter()
        .map(|gender| {
            let values: Vec<u64> = table
                .iter()
                .filter(|r| r.gender == *gender)
                .filter_map(|r| r.value)
                .collect();
            summarize_values(*gender, &values)
        })
        .collect()
}

/// Summary rows plus the groups that had nothing to summarize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryOutcome {
    pub rows: Vec<SummaryRow>,
    pub empty: Vec<EmptyInputError>,
}

/// Summarize under `scope`. Empty groups become zero-valued rows.
pub fn summarize_scoped(
    table: &TidyTable,
    scope: &SummaryScope,
    selected_genders: &[Gender],
    selected_categories: &[String],
) -> SummaryOutcome {
    let both: &[Gender] = &Gender::ALL;
    let (records, genders): (TidyTable, &[Gender]) = match scope {
        SummaryScope::FixedCategory(category) => (
            table.iter().filter(|r| &r.category == category).cloned().collect(),
            both,
        ),
        SummaryScope::Selection => (
            table
                .iter()
                .filter(|r| selected_categories.iter().any(|c| c == &r.category))
                .cloned()
                .collect(),
            selected_genders,
        ),
    };

    let mut outcome = SummaryOutcome::default();
    for (gender, result) in genders.iter().zip(summarize(&records, genders)) {
        match result {
            Ok(row) => outcome.rows.push(row),
            Err(e) => {
                outcome.rows.push(SummaryRow::empty(*gender));
                outcome.empty.push(e);
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TidyRecord;

    fn record(category: &str, year: i32, gender: Gender, value: Option<u64>) -> TidyRecord {
        TidyRecord {
            category: category.to_string(),
            year,
            gender,
            value,
        }
    }

    fn series(category: &str, gender: Gender, values: &[u64]) -> Vec<TidyRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| record(category, 2008 + i as i32, gender, Some(*v)))
            .collect()
    }

    #[test]
    fn test_female_scenario() {
        let values = [100, 110, 120, 130, 140, 150, 160, 170, 180, 190];
        let row = summarize_values(Gender::Female, &values).unwrap();
        assert_eq!(row.min, 100);
        assert_eq!(row.max, 190);
        assert_eq!(row.mean, 145.0);
        assert_eq!(row.median, 145.0);
        assert_eq!(row.count, 10);
    }

    #[test]
    fn test_odd_count_median() {
        let row = summarize_values(Gender::Male, &[9, 1, 5]).unwrap();
        assert_eq!(row.median, 5.0);
        assert_eq!(row.mean, 5.0);
    }

    #[test]
    fn test_ordering_bounds() {
        let samples: [&[u64]; 4] = [&[7], &[1, 1000], &[3, 3, 3, 90], &[50, 2, 8, 1, 40]];
        for values in samples {
            let row = summarize_values(Gender::Female, values).unwrap();
            assert!(row.min as f64 <= row.median && row.median <= row.max as f64);
            assert!(row.min as f64 <= row.mean && row.mean <= row.max as f64);
        }
    }

    #[test]
    fn test_empty_group_signals() {
        let err = summarize_values(Gender::Male, &[]).unwrap_err();
        assert_eq!(err, EmptyInputError::new("summary", "Male"));
    }

    #[test]
    fn test_empty_markers_skipped() {
        let table = TidyTable::new(vec![
            record(ALL_RECIPIENTS, 2008, Gender::Female, Some(10)),
            record(ALL_RECIPIENTS, 2009, Gender::Female, None),
            record(ALL_RECIPIENTS, 2010, Gender::Female, Some(30)),
        ]);
        let rows = summarize(&table, &[Gender::Female]);
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.count, 2);
        assert_eq!(row.mean, 20.0);
    }

    #[test]
    fn test_fixed_scope_ignores_selection() {
        let mut records = series(ALL_RECIPIENTS, Gender::Female, &[100, 200]);
        records.extend(series(ALL_RECIPIENTS, Gender::Male, &[300, 400]));
        records.extend(series("Asian", Gender::Female, &[1, 2]));
        let table = TidyTable::new(records);

        let outcome = summarize_scoped(
            &table,
            &SummaryScope::default(),
            &[Gender::Female],
            &["Asian".to_string()],
        );
        assert!(outcome.empty.is_empty());
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].gender, Gender::Female);
        assert_eq!(outcome.rows[0].mean, 150.0);
        assert_eq!(outcome.rows[1].max, 400);
    }

    #[test]
    fn test_selection_scope_follows_selection() {
        let mut records = series(ALL_RECIPIENTS, Gender::Female, &[100, 200]);
        records.extend(series("Asian", Gender::Female, &[1, 2]));
        records.extend(series("Asian", Gender::Male, &[5, 6]));
        let table = TidyTable::new(records);

        let outcome = summarize_scoped(
            &table,
            &SummaryScope::Selection,
            &[Gender::Female],
            &["Asian".to_string()],
        );
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].max, 2);
    }

    #[test]
    fn test_missing_gender_becomes_zero_row() {
        let table = TidyTable::new(series(ALL_RECIPIENTS, Gender::Female, &[1, 2, 3]));
        let outcome = summarize_scoped(&table, &SummaryScope::default(), &Gender::ALL, &[]);
        assert_eq!(outcome.rows[1], SummaryRow::empty(Gender::Male));
        assert_eq!(outcome.empty.len(), 1);
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!("fixed".parse::<SummaryScope>().unwrap(), SummaryScope::default());
        assert_eq!("Selection".parse::<SummaryScope>().unwrap(), SummaryScope::Selection);
        assert!("everything".parse::<SummaryScope>().is_err());
    }
}
