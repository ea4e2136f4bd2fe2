//! # Doctorates - Survey of Earned Doctorates dashboard backend
//!
//! Fetches the published NCSES doctorate tables (female and male recipients
//! by ethnicity and race, plus field of study), reshapes them and serves
//! everything an interactive dashboard displays.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌──────────────┐    ┌─────────────┐
//! │ xlsx / csv  │───▶│   Parser    │───▶│  Transform   │───▶│  Dashboard  │
//! │ (http/file) │    │  (cached)   │    │ (filter/melt)│    │ (JSON/API)  │
//! └─────────────┘    └─────────────┘    └──────────────┘    └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use doctorates::{load_dashboard, DashboardConfig, DashboardRequest, HttpFetcher, SourceCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DashboardConfig::from_env()?;
//!     let fetcher = HttpFetcher::new(config.fetch_timeout(), config.fetch_attempts)?;
//!     let cache = SourceCache::new(fetcher, config.header_row);
//!     let dashboard = load_dashboard(&cache, &config, &DashboardRequest::default()).await;
//!     println!("{} summary rows", dashboard.summary.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (Sheet, RawTable, TidyTable, WideTable)
//! - [`parser`] - xlsx/CSV parsing with header skipping
//! - [`fetch`] - HTTP retrieval with timeout and retries
//! - [`cache`] - Fetch-once source cache
//! - [`transform`] - Filter, melt, select, summary and the pipeline
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Sources
pub mod parser;
pub mod fetch;
pub mod cache;

// Transformation
pub mod transform;

// Configuration
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, DashboardError, DashboardResult, EmptyInputError, FetchError, SchemaError,
    ServerError, SheetError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Cell, FieldByGender, FieldCount, Gender, Notice, NoticeKind, RawRow, RawTable, Sheet,
    SummaryRow, TidyRecord, TidyTable, WideRow, WideTable,
};

// =============================================================================
// Re-exports - Parsing & sources
// =============================================================================

pub use parser::{parse_bytes_auto, parse_csv, parse_xlsx, ParseResult, SheetFormat};
pub use fetch::{HttpFetcher, SheetFetcher};
pub use cache::{CachedSource, SourceCache};
pub use config::{DashboardConfig, SourceUrls};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    build_dashboard, combine, field_totals, fields_by_gender, filter_and_rename, load_dashboard,
    load_dashboard_strict, load_sources, melt, select, summarize, summarize_scoped, wide_table,
    Dashboard, DashboardRequest, FieldLayout, ReshapeProfile, RowFilter, Selection, SourceSheets,
    SummaryScope, ALL_RECIPIENTS,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, DashboardQuery, DashboardResponse, SectionResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
