//! Source retrieval for published spreadsheets.
//!
//! [`SheetFetcher`] is the seam between the cache and the network. The
//! production [`HttpFetcher`] applies a request timeout and a fixed number
//! of attempts with a constant delay; `file://` URLs are read from disk so
//! the dashboard can run against local copies of the tables.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};

/// Default number of attempts per source
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay between attempts in milliseconds
pub const RETRY_DELAY_MS: u64 = 1000;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Retrieves the raw bytes of a source table.
pub trait SheetFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = FetchResult<Vec<u8>>> + Send;
}

/// reqwest-backed fetcher with timeout and retries.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the given per-request timeout and attempt count.
    pub fn new(timeout: Duration, max_attempts: u32) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("doctorates/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::RequestFailed {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    /// Set the delay between attempts
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Single attempt
    async fn try_fetch(&self, url: &str) -> FetchResult<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(|e| map_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| map_reqwest(url, e))?;
        debug!(url, bytes = bytes.len(), "fetched source");
        Ok(bytes.to_vec())
    }
}

impl SheetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Vec<u8>> {
        if let Some(path) = url.strip_prefix("file://") {
            return read_local(path).await;
        }

        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.try_fetch(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    warn!(
                        url,
                        attempt,
                        max = self.max_attempts,
                        error = %e,
                        "fetch attempt failed"
                    );
                    // Client errors will not change on retry
                    let client_error = matches!(
                        e,
                        FetchError::HttpStatus { status, .. } if (400..500).contains(&status)
                    );
                    if client_error {
                        return Err(e);
                    }
                    last_error = Some(e);

                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            last: Box::new(last_error.unwrap_or_else(|| FetchError::RequestFailed {
                url: url.to_string(),
                message: "no attempt made".to_string(),
            })),
        })
    }
}

async fn read_local(path: &str) -> FetchResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| FetchError::Io {
        path: path.to_string(),
        source,
    })
}

fn map_reqwest(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::RequestFailed {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
