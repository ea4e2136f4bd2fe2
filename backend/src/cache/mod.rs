//! Source cache - fetch each published table once per process
//!
//! Parsed sheets are memoized by source URL with no eviction: the
//! published tables are static for the lifetime of a session. Concurrent
//! requests for the same URL share a single fetch. Failed fetches are not
//! cached, so the next request tries again.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::info;

use crate::error::DashboardResult;
use crate::fetch::SheetFetcher;
use crate::models::Sheet;
use crate::parser::{parse_bytes_auto, SheetFormat};

/// A cached sheet with metadata
#[derive(Debug, Clone)]
pub struct CachedSheet {
    /// The parsed sheet
    pub sheet: Arc<Sheet>,
    /// Container format the source was read as
    pub format: SheetFormat,
    /// When the source was fetched
    pub fetched_at: DateTime<Utc>,
}

/// Summary of one cache entry, for diagnostics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSource {
    pub url: String,
    pub format: SheetFormat,
    pub rows: usize,
    pub columns: usize,
    pub fetched_at: String,
}

/// Memoizing cache of parsed source sheets, keyed by URL
pub struct SourceCache<F> {
    fetcher: F,
    header_row: usize,
    entries: Mutex<HashMap<String, Arc<OnceCell<CachedSheet>>>>,
}

impl<F: SheetFetcher> SourceCache<F> {
    /// Create an empty cache that parses sources with the given header row
    pub fn new(fetcher: F, header_row: usize) -> Self {
        Self {
            fetcher,
            header_row,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get the parsed sheet for `url`, fetching it on first use
    pub async fn get(&self, url: &str) -> DashboardResult<Arc<Sheet>> {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(url.to_string()).or_default().clone()
        };

        let cached = cell
            .get_or_try_init(|| async {
                let bytes = self.fetcher.fetch(url).await?;
                let parsed = parse_bytes_auto(&bytes, self.header_row)?;
                info!(
                    url,
                    format = ?parsed.format,
                    rows = parsed.sheet.rows.len(),
                    "cached source"
                );
                Ok::<_, crate::error::DashboardError>(CachedSheet {
                    sheet: Arc::new(parsed.sheet),
                    format: parsed.format,
                    fetched_at: Utc::now(),
                })
            })
            .await?;

        Ok(cached.sheet.clone())
    }

    /// Whether `url` has been fetched and parsed successfully
    pub async fn contains(&self, url: &str) -> bool {
        let entries = self.entries.lock().await;
        entries.get(url).is_some_and(|cell| cell.initialized())
    }

    /// List successfully cached sources
    pub async fn list(&self) -> Vec<CachedSource> {
        let entries = self.entries.lock().await;
        let mut out: Vec<CachedSource> = entries
            .iter()
            .filter_map(|(url, cell)| {
                cell.get().map(|c| CachedSource {
                    url: url.clone(),
                    format: c.format,
                    rows: c.sheet.rows.len(),
                    columns: c.sheet.headers.len(),
                    fetched_at: c.fetched_at.to_rfc3339(),
                })
            })
            .collect();
        out.sort_by(|a, b| a.url.cmp(&b.url));
        out
    }
}
