//! REST API types for the dashboard frontend.
//!
//! Query strings mirror the sidebar widgets. Category labels may contain
//! commas (`White, non-Hispanic`), so each `category` parameter carries
//! exactly one label and the parameter repeats for several. Genders may
//! also be comma-separated. An absent parameter means "widget default"
//! while a present but empty one (`?category=`) is an explicit empty
//! selection.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{Gender, Notice};
use crate::transform::pipeline::{Dashboard, DashboardRequest, ReshapeProfile, Selection};
use crate::transform::summary::SummaryScope;

/// Query parameters accepted by every dashboard endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardQuery {
    pub year: Option<String>,
    /// Raw `gender` values, each possibly a comma-separated list
    pub genders: Option<Vec<String>>,
    /// One label per `category` value, never split
    pub categories: Option<Vec<String>>,
    /// `fixed` or `selection`
    pub scope: Option<String>,
    /// `race-ethnicity` or `race`
    pub profile: Option<String>,
}

impl DashboardQuery {
    /// Collect decoded query pairs. `gender(s)` and `category`/`categories`
    /// may repeat; unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "year" => query.year = Some(value),
                "gender" | "genders" => query.genders.get_or_insert_with(Vec::new).push(value),
                "category" | "categories" => {
                    query.categories.get_or_insert_with(Vec::new).push(value)
                }
                "scope" => query.scope = Some(value),
                "profile" => query.profile = Some(value),
                _ => {}
            }
        }
        query
    }

    /// Resolve into a pipeline request, falling back to `default_scope`.
    pub fn into_request(self, default_scope: &SummaryScope) -> Result<DashboardRequest, String> {
        let profile = match self.profile.as_deref().map(str::trim) {
            None | Some("") => ReshapeProfile::default(),
            Some(name) => {
                ReshapeProfile::by_name(name).ok_or_else(|| format!("unknown profile '{}'", name))?
            }
        };

        let scope = match self.scope.as_deref().map(str::trim) {
            None | Some("") => default_scope.clone(),
            Some(raw) => raw.parse()?,
        };

        let year = match self.year.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i32>()
                    .map_err(|_| format!("invalid year '{}'", raw))?,
            ),
        };

        let genders = match self.genders {
            None => None,
            Some(raw) => Some(
                raw.iter()
                    .flat_map(|v| split_list(v))
                    .map(|g| g.parse::<Gender>())
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let categories = self.categories.map(|labels| {
            labels
                .into_iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect()
        });

        Ok(DashboardRequest {
            profile,
            selection: Selection {
                year,
                genders,
                categories,
            },
            scope,
        })
    }
}

/// Split a comma-separated list, dropping blank entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Full dashboard response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    /// Unique request identifier
    pub request_id: String,
    /// "ready" or "warning" (some notices were raised)
    pub status: String,
    pub dashboard: Dashboard,
}

impl From<Dashboard> for DashboardResponse {
    fn from(dashboard: Dashboard) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            status: status_for(&dashboard.notices).to_string(),
            dashboard,
        }
    }
}

/// One section of the dashboard (table, trend, summary, fields).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResponse<T> {
    pub request_id: String,
    pub status: String,
    pub data: T,
    pub notices: Vec<Notice>,
}

impl<T> SectionResponse<T> {
    /// Extract one section, keeping the notices alongside it.
    pub fn from_dashboard(dashboard: Dashboard, section: impl FnOnce(Dashboard) -> T) -> Self {
        let notices = dashboard.notices.clone();
        Self {
            request_id: Uuid::new_v4().to_string(),
            status: status_for(&notices).to_string(),
            data: section(dashboard),
            notices,
        }
    }
}

fn status_for(notices: &[Notice]) -> &'static str {
    if notices.is_empty() {
        "ready"
    } else {
        "warning"
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "requestId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}
