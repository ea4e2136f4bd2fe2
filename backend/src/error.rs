//! Error types for the doctorate dashboard pipeline.
//!
//! This module defines one error type per concern:
//!
//! - [`FetchError`] - Network or filesystem failure retrieving a source table
//! - [`SheetError`] - Spreadsheet bytes that cannot be read as a table
//! - [`SchemaError`] - Expected category or year columns missing upstream
//! - [`EmptyInputError`] - A reshape or summary given zero qualifying rows
//! - [`ConfigError`] - Invalid environment configuration
//! - [`DashboardError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Fetch Errors
// =============================================================================

/// Errors retrieving a source spreadsheet.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("Request to {url} failed: {message}")]
    RequestFailed { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// The request did not complete within the configured timeout.
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Local file source could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Every attempt failed; carries the last failure.
    #[error("Gave up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

// =============================================================================
// Sheet Errors
// =============================================================================

/// Errors reading spreadsheet bytes into a [`crate::models::Sheet`].
#[derive(Debug, Error)]
pub enum SheetError {
    /// The workbook container could not be opened.
    #[error("Invalid workbook: {0}")]
    Workbook(String),

    /// The workbook has no worksheet to read.
    #[error("Workbook contains no worksheet")]
    NoWorksheet,

    /// CSV content could not be decoded or split.
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The sheet is shorter than the multi-row header.
    #[error("Header row {header_row} not found (sheet has {rows} rows)")]
    MissingHeaderRow { header_row: usize, rows: usize },
}

// =============================================================================
// Schema Errors
// =============================================================================

/// An expected column or row is missing or was renamed upstream.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    /// The category column header was not found.
    #[error("Missing category column '{expected}' (found: {found:?})")]
    MissingCategoryColumn { expected: String, found: Vec<String> },

    /// No header parses as a year.
    #[error("No year columns next to category column '{category}'")]
    NoYearColumns { category: String },

    /// A required labelled row was not found.
    #[error("Missing row '{label}' in column '{column}'")]
    MissingRow { column: String, label: String },
}

// =============================================================================
// Empty Input
// =============================================================================

/// A reshape or summary operation was given zero qualifying records.
///
/// Callers turn this into an empty or zero-valued result so the rendering
/// layer can show an empty-state.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("No qualifying records for {operation} ({group})")]
pub struct EmptyInputError {
    pub operation: &'static str,
    pub group: String,
}

impl EmptyInputError {
    pub fn new(operation: &'static str, group: impl Into<String>) -> Self {
        Self {
            operation,
            group: group.into(),
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Invalid configuration value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used.
    #[error("Invalid value '{value}' for {key}: {message}")]
    Invalid {
        key: String,
        value: String,
        message: String,
    },
}

// =============================================================================
// Dashboard Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// [`crate::transform::pipeline::load_dashboard`] converts these into
/// notices; the variants surface directly only from the lower-level
/// loading helpers and the CLI.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Empty input: {0}")]
    EmptyInput(#[from] EmptyInputError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Dashboard error: {0}")]
    Dashboard(#[from] DashboardError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Listener could not be bound or the server stopped.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for sheet parsing.
pub type SheetResult<T> = Result<T, SheetError>;

/// Result type for schema-dependent operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for dashboard operations.
pub type DashboardResult<T> = Result<T, DashboardError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
