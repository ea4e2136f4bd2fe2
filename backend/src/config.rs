//! Runtime configuration.
//!
//! Defaults point at the published NCSES 2017 Survey of Earned Doctorates
//! tables. Every value can be overridden from the environment (a `.env`
//! file is loaded first when present).
//!
//! | Variable                         | Default                     |
//! |----------------------------------|-----------------------------|
//! | `DOCTORATES_FEMALE_URL`          | table 21 (female recipients)|
//! | `DOCTORATES_MALE_URL`            | table 20 (male recipients)  |
//! | `DOCTORATES_FIELDS_URL`          | table 54 (field of study); empty disables |
//! | `DOCTORATES_HEADER_ROW`          | `3`                         |
//! | `DOCTORATES_FETCH_TIMEOUT_SECS`  | `30`                        |
//! | `DOCTORATES_FETCH_ATTEMPTS`      | `3`                         |
//! | `DOCTORATES_PORT`                | `3000`                      |
//! | `DOCTORATES_SUMMARY_SCOPE`       | `fixed` (`fixed`\|`selection`) |

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::fetch::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS};
use crate::parser::DEFAULT_HEADER_ROW;
use crate::transform::summary::SummaryScope;

/// Female doctorate recipients by ethnicity and race, 2008-17.
pub const FEMALE_URL: &str =
    "https://ncses.nsf.gov/pubs/nsf19301/assets/data/tables/sed17-sr-tab021.xlsx";

/// Male doctorate recipients by ethnicity and race, 2008-17.
pub const MALE_URL: &str =
    "https://ncses.nsf.gov/pubs/nsf19301/assets/data/tables/sed17-sr-tab020.xlsx";

/// Doctorate recipients by field of study and characteristic, 2017.
pub const FIELDS_URL: &str =
    "https://ncses.nsf.gov/pubs/nsf19301/assets/data/tables/sed17-sr-tab054.xlsx";

/// Source table locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUrls {
    pub female: String,
    pub male: String,
    /// Field-of-study table; `None` hides the field charts
    pub fields: Option<String>,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            female: FEMALE_URL.to_string(),
            male: MALE_URL.to_string(),
            fields: Some(FIELDS_URL.to_string()),
        }
    }
}

/// Dashboard service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub sources: SourceUrls,
    /// Zero-indexed row holding the real headers
    pub header_row: usize,
    pub fetch_timeout_secs: u64,
    pub fetch_attempts: u32,
    pub port: u16,
    pub summary_scope: SummaryScope,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            sources: SourceUrls::default(),
            header_row: DEFAULT_HEADER_ROW,
            fetch_timeout_secs: DEFAULT_TIMEOUT_SECS,
            fetch_attempts: DEFAULT_MAX_ATTEMPTS,
            port: 3000,
            summary_scope: SummaryScope::default(),
        }
    }
}

impl DashboardConfig {
    /// Load from the process environment (after reading `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("DOCTORATES_FEMALE_URL") {
            config.sources.female = url;
        }
        if let Some(url) = lookup("DOCTORATES_MALE_URL") {
            config.sources.male = url;
        }
        if let Some(url) = lookup("DOCTORATES_FIELDS_URL") {
            config.sources.fields = if url.trim().is_empty() { None } else { Some(url) };
        }
        if let Some(v) = parse_var(&lookup, "DOCTORATES_HEADER_ROW")? {
            config.header_row = v;
        }
        if let Some(v) = parse_var(&lookup, "DOCTORATES_FETCH_TIMEOUT_SECS")? {
            config.fetch_timeout_secs = v;
        }
        if let Some(v) = parse_var::<u32, _>(&lookup, "DOCTORATES_FETCH_ATTEMPTS")? {
            if v == 0 {
                return Err(invalid("DOCTORATES_FETCH_ATTEMPTS", "0", "must be at least 1"));
            }
            config.fetch_attempts = v;
        }
        if let Some(v) = parse_var(&lookup, "DOCTORATES_PORT")? {
            config.port = v;
        }
        if let Some(v) = parse_var(&lookup, "DOCTORATES_SUMMARY_SCOPE")? {
            config.summary_scope = v;
        }

        Ok(config)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(key, &raw, &e.to_string())),
    }
}

fn invalid(key: &str, value: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}
