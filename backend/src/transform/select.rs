//! Year / gender / category selection over the combined wide table.
//!
//! This is what the sidebar widgets drive: one year, any subset of
//! genders, any subset of categories. The result is itself a
//! [`WideTable`] with a single year column, so selecting again with the
//! same criteria returns it unchanged.

use crate::models::{Gender, RawTable, WideRow, WideTable};

/// Stack per-gender raw tables into one wide table with a gender column.
///
/// Rows keep the order of `tables` (female first by convention), then
/// source row order. Year columns are the union of all tables' years in
/// first-seen order; a year missing from one table is an empty marker.
pub fn wide_table(tables: &[(Gender, &RawTable)]) -> WideTable {
    let mut years: Vec<i32> = Vec::new();
    for (_, table) in tables {
        for year in &table.years {
            if !years.contains(year) {
                years.push(*year);
            }
        }
    }

    let rows = tables
        .iter()
        .flat_map(|(gender, table)| {
            let years = &years;
            table.rows.iter().map(move |row| WideRow {
                gender: *gender,
                category: row.category.clone(),
                values: years
                    .iter()
                    .map(|y| {
                        table
                            .years
                            .iter()
                            .position(|ty| ty == y)
                            .and_then(|i| row.values.get(i).copied().flatten())
                    })
                    .collect(),
            })
        })
        .collect();

    WideTable { years, rows }
}

/// Project `table` to one year and the selected genders and categories.
///
/// Empty selections, and a year the table does not have, yield an empty
/// table rather than an error.
pub fn select(
    table: &WideTable,
    year: i32,
    genders: &[Gender],
    categories: &[String],
) -> WideTable {
    let Some(idx) = table.year_index(year) else {
        return WideTable::default();
    };

    let rows = table
        .rows
        .iter()
        .filter(|r| genders.contains(&r.gender))
        .filter(|r| categories.iter().any(|c| c == &r.category))
        .map(|r| WideRow {
            gender: r.gender,
            category: r.category.clone(),
            values: vec![r.values.get(idx).copied().flatten()],
        })
        .collect();

    WideTable {
        years: vec![year],
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRow;

    fn raw(labels: &[&str], base: u64) -> RawTable {
        RawTable {
            category_column: "Race_Ethnicity".into(),
            years: (2008..=2017).collect(),
            rows: labels
                .iter()
                .enumerate()
                .map(|(i, l)| RawRow {
                    category: l.to_string(),
                    values: (0..10).map(|y| Some(base + i as u64 * 1000 + y)).collect(),
                })
                .collect(),
        }
    }

    fn combined() -> WideTable {
        let labels = ["All doctorate recipients", "Asian", "Black or African American"];
        let female = raw(&labels, 20000);
        let male = raw(&labels, 30000);
        wide_table(&[(Gender::Female, &female), (Gender::Male, &male)])
    }

    fn all_recipients() -> Vec<String> {
        vec!["All doctorate recipients".to_string()]
    }

    #[test]
    fn test_wide_table_order() {
        let wide = combined();
        assert_eq!(wide.len(), 6);
        assert_eq!(wide.rows[0].gender, Gender::Female);
        assert_eq!(wide.rows[3].gender, Gender::Male);
        assert_eq!(wide.genders(), vec![Gender::Female, Gender::Male]);
        assert_eq!(wide.categories().len(), 3);
    }

    #[test]
    fn test_wide_table_aligns_years() {
        let mut short = raw(&["A"], 0);
        short.years = vec![2017];
        short.rows[0].values = vec![Some(7)];
        let long = raw(&["A"], 100);

        let wide = wide_table(&[(Gender::Female, &short), (Gender::Male, &long)]);
        assert_eq!(wide.years[0], 2017);
        assert_eq!(wide.years.len(), 10);
        assert_eq!(wide.rows[0].values[0], Some(7));
        assert_eq!(wide.rows[0].values[1], None);
        assert_eq!(wide.rows[1].values[0], Some(109));
    }

    #[test]
    fn test_single_row_scenario() {
        let out = select(&combined(), 2015, &[Gender::Female], &all_recipients());
        assert_eq!(out.years, vec![2015]);
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows[0].category, "All doctorate recipients");
        assert_eq!(out.rows[0].values, vec![Some(20007)]);
    }

    #[test]
    fn test_selection_is_idempotent() {
        let genders = [Gender::Male, Gender::Female];
        let categories = vec!["Asian".to_string(), "All doctorate recipients".to_string()];
        let once = select(&combined(), 2010, &genders, &categories);
        let twice = select(&once, 2010, &genders, &categories);
        assert_eq!(once.len(), 4);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_selections() {
        let wide = combined();
        assert!(select(&wide, 2015, &[], &all_recipients()).is_empty());
        assert!(select(&wide, 2015, &Gender::ALL, &[]).is_empty());
    }

    #[test]
    fn test_unknown_year() {
        let out = select(&combined(), 1999, &Gender::ALL, &all_recipients());
        assert!(out.is_empty());
        assert!(out.years.is_empty());
    }
}
