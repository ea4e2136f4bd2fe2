//! Transformation module.
//!
//! - Filter: row exclusion and category rename
//! - Reshape: generic wide-to-long melt shared by both table layouts
//! - Melt / Select: tidy trend data and the single-year selection table
//! - Summary: per-gender statistics
//! - Fields: field-of-study transpose
//! - Pipeline: the whole dashboard in one call

pub mod fields;
pub mod filter;
pub mod melt;
pub mod pipeline;
pub mod reshape;
pub mod select;
pub mod summary;

pub use fields::{field_totals, fields_by_gender, FieldLayout};
pub use filter::{
    filter_and_rename, filter_records, filter_rows, rename_category, RenameMap, RowFilter,
};
pub use melt::{combine, combine_all, melt, restrict_category};
pub use pipeline::*;
pub use select::{select, wide_table};
pub use summary::{
    summarize, summarize_scoped, summarize_values, SummaryOutcome, SummaryScope, ALL_RECIPIENTS,
};
