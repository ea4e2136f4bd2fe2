//! High-level dashboard pipeline.
//!
//! Combines every step behind one call: sources are fetched once through
//! the [`SourceCache`], then filtered, reshaped, selected and summarized
//! again on every request. The reshape is cheap and pure; only the fetch
//! is memoized.
//!
//! ```text
//! female sheet ─┐                     ┌─▶ selection table (one year)
//!               ├─ filter + rename ───┼─▶ trend (melt + combine)
//! male sheet ───┘                     └─▶ summary (per gender)
//! fields sheet ──── transpose ───────────▶ field totals / gender pairs
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use doctorates::{load_dashboard, DashboardConfig, DashboardRequest, HttpFetcher, SourceCache};
//!
//! let config = DashboardConfig::from_env()?;
//! let fetcher = HttpFetcher::new(config.fetch_timeout(), config.fetch_attempts)?;
//! let cache = SourceCache::new(fetcher, config.header_row);
//! let dashboard = load_dashboard(&cache, &config, &DashboardRequest::default()).await;
//! println!("{} rows selected for {:?}", dashboard.table.len(), dashboard.selected_year);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::fields::{field_totals, fields_by_gender, FieldLayout};
use super::filter::{filter_and_rename, RenameMap, RowFilter};
use super::melt::{combine_all, melt, restrict_category};
use super::select::{select, wide_table};
use super::summary::{summarize_scoped, SummaryScope, ALL_RECIPIENTS};
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::cache::SourceCache;
use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::fetch::SheetFetcher;
use crate::models::{
    FieldByGender, FieldCount, Gender, Notice, NoticeKind, RawTable, Sheet, SummaryRow, TidyTable,
    WideTable,
};

/// Raw category header used by the ethnicity and race tables.
pub const RAW_CATEGORY_HEADER: &str = "Ethnicity, race, and citizenship status";

// =============================================================================
// Profiles & requests
// =============================================================================

/// How the raw tables are renamed and filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReshapeProfile {
    /// Short name used on the command line and in query strings
    pub name: String,
    /// Category header as published
    pub raw_category_header: String,
    /// Display name the category column is renamed to
    pub category_label: String,
    pub filter: RowFilter,
    pub fields: FieldLayout,
}

impl ReshapeProfile {
    /// Race and ethnicity, citizenship and visa breakdowns removed.
    pub fn race_ethnicity() -> Self {
        Self {
            name: "race-ethnicity".to_string(),
            raw_category_header: RAW_CATEGORY_HEADER.to_string(),
            category_label: "Race_Ethnicity".to_string(),
            filter: RowFilter::new(["citizen", "visa", "Not"]),
            fields: FieldLayout::default(),
        }
    }

    /// Race only: additionally drops the Hispanic/ethnicity rows.
    pub fn race() -> Self {
        Self {
            name: "race".to_string(),
            raw_category_header: RAW_CATEGORY_HEADER.to_string(),
            category_label: "Race".to_string(),
            filter: RowFilter::new(["citizen", "visa", "Not", "Hispanic", "Ethnicity"]),
            fields: FieldLayout::default(),
        }
    }

    /// Look a profile up by name
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "race-ethnicity" | "race_ethnicity" => Some(Self::race_ethnicity()),
            "race" => Some(Self::race()),
            _ => None,
        }
    }

    pub fn renames(&self) -> RenameMap {
        let mut renames = RenameMap::new();
        renames.insert(self.raw_category_header.clone(), self.category_label.clone());
        renames
    }
}

impl Default for ReshapeProfile {
    fn default() -> Self {
        Self::race_ethnicity()
    }
}

/// Sidebar widget state. `None` means the widget default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Defaults to the most recent year
    pub year: Option<i32>,
    /// Defaults to every gender present
    pub genders: Option<Vec<Gender>>,
    /// Defaults to every category present
    pub categories: Option<Vec<String>>,
}

/// Everything one dashboard evaluation depends on besides the sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRequest {
    pub profile: ReshapeProfile,
    pub selection: Selection,
    pub scope: SummaryScope,
}

/// Parsed source sheets; a missing sheet contributes nothing.
#[derive(Debug, Clone, Default)]
pub struct SourceSheets {
    pub female: Option<Arc<Sheet>>,
    pub male: Option<Arc<Sheet>>,
    pub fields: Option<Arc<Sheet>>,
}

// =============================================================================
// Output
// =============================================================================

/// Everything the rendering layer displays
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Renamed category column (e.g. `Race_Ethnicity`)
    pub category_label: String,
    /// Years available to the year selector
    pub years: Vec<i32>,
    pub selected_year: Option<i32>,
    /// Options for the gender multi-select
    pub genders: Vec<Gender>,
    /// Options for the category multi-select
    pub categories: Vec<String>,
    /// Selection table: one year, selected genders and categories
    pub table: WideTable,
    /// Line chart series, female then male
    pub trend: TidyTable,
    pub summary: Vec<SummaryRow>,
    pub summary_scope: SummaryScope,
    pub fields: Vec<FieldCount>,
    pub fields_by_gender: Vec<FieldByGender>,
    /// Banners and empty-state markers
    pub notices: Vec<Notice>,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Build the dashboard from already-fetched sheets.
///
/// Pure and total: schema problems and empty inputs are reported as
/// notices with empty output in their place.
pub fn build_dashboard(sources: &SourceSheets, request: &DashboardRequest) -> Dashboard {
    let profile = &request.profile;
    let mut notices = Vec::new();

    // Per-gender wide tables, female first
    let mut tables: Vec<(Gender, RawTable)> = Vec::new();
    for (gender, sheet) in [(Gender::Female, &sources.female), (Gender::Male, &sources.male)] {
        let Some(sheet) = sheet else { continue };
        match RawTable::from_sheet(sheet, &profile.raw_category_header) {
            Ok(raw) => {
                let table = filter_and_rename(raw, &profile.renames(), &profile.filter);
                if table.is_empty() {
                    notices.push(Notice::new(
                        NoticeKind::EmptyInput,
                        gender.as_str(),
                        "every row was excluded by the row filter",
                    ));
                }
                tables.push((gender, table));
            }
            Err(e) => {
                log_warning(format!("{} table: {}", gender, e));
                notices.push(Notice::new(NoticeKind::Schema, gender.as_str(), e.to_string()));
            }
        }
    }

    let refs: Vec<(Gender, &RawTable)> = tables.iter().map(|(g, t)| (*g, t)).collect();
    let wide = wide_table(&refs);
    let years = wide.years.clone();
    let genders = wide.genders();
    let categories = wide.categories();

    let selected_year = request
        .selection
        .year
        .or_else(|| years.iter().copied().max());
    let selected_genders = request.selection.genders.clone().unwrap_or_else(|| genders.clone());
    let selected_categories = request
        .selection
        .categories
        .clone()
        .unwrap_or_else(|| categories.clone());

    let table = match selected_year {
        Some(year) => select(&wide, year, &selected_genders, &selected_categories),
        None => WideTable::default(),
    };
    if table.is_empty() {
        notices.push(Notice::new(
            NoticeKind::EmptyInput,
            "selection",
            match selected_year {
                Some(year) if !years.contains(&year) => format!("no data for year {}", year),
                _ => "no rows match the current selection".to_string(),
            },
        ));
    }

    let tidy = combine_all(tables.iter().map(|(g, t)| melt(t, *g)));
    let trend = restrict_category(&tidy, ALL_RECIPIENTS);

    let outcome = summarize_scoped(&tidy, &request.scope, &selected_genders, &selected_categories);
    for empty in outcome.empty {
        notices.push(Notice::new(NoticeKind::EmptyInput, "summary", empty.to_string()));
    }

    let (fields, fields_by_gender) = match &sources.fields {
        Some(sheet) => {
            let totals = field_totals(sheet, &profile.fields).unwrap_or_else(|e| {
                notices.push(Notice::new(NoticeKind::Schema, "fields", e.to_string()));
                Vec::new()
            });
            let pairs = fields_by_gender(sheet, &profile.fields).unwrap_or_else(|e| {
                notices.push(Notice::new(NoticeKind::Schema, "fields", e.to_string()));
                Vec::new()
            });
            (totals, pairs)
        }
        None => (Vec::new(), Vec::new()),
    };

    Dashboard {
        category_label: profile.category_label.clone(),
        years,
        selected_year,
        genders,
        categories,
        table,
        trend,
        summary: outcome.rows,
        summary_scope: request.scope.clone(),
        fields,
        fields_by_gender,
        notices,
    }
}

/// Fetch one source through the cache, turning failures into a notice.
async fn load_source<F: SheetFetcher>(
    cache: &SourceCache<F>,
    name: &str,
    url: &str,
    notices: &mut Vec<Notice>,
) -> Option<Arc<Sheet>> {
    match cache.get(url).await {
        Ok(sheet) => {
            log_success(format!("{} table ready ({} rows)", name, sheet.rows.len()));
            Some(sheet)
        }
        Err(e) => {
            log_warning(format!("{} table unavailable: {}", name, e));
            notices.push(source_notice(name, &e));
            None
        }
    }
}

fn source_notice(name: &str, error: &DashboardError) -> Notice {
    let kind = match error {
        DashboardError::Schema(_) => NoticeKind::Schema,
        DashboardError::EmptyInput(_) => NoticeKind::EmptyInput,
        _ => NoticeKind::Fetch,
    };
    Notice::new(kind, name, error.to_string())
}

/// Fetch every configured source (at most once per URL per process).
pub async fn load_sources<F: SheetFetcher>(
    cache: &SourceCache<F>,
    config: &DashboardConfig,
) -> (SourceSheets, Vec<Notice>) {
    let mut female_notices = Vec::new();
    let mut male_notices = Vec::new();
    let mut field_notices = Vec::new();

    let urls = &config.sources;
    let (female, male, fields) = tokio::join!(
        load_source(cache, "Female", &urls.female, &mut female_notices),
        load_source(cache, "Male", &urls.male, &mut male_notices),
        async {
            match &urls.fields {
                Some(url) => load_source(cache, "fields", url, &mut field_notices).await,
                None => None,
            }
        },
    );

    let mut notices = female_notices;
    notices.extend(male_notices);
    notices.extend(field_notices);

    (SourceSheets { female, male, fields }, notices)
}

/// Load sources and build the dashboard. Never fails: problems are notices.
pub async fn load_dashboard<F: SheetFetcher>(
    cache: &SourceCache<F>,
    config: &DashboardConfig,
    request: &DashboardRequest,
) -> Dashboard {
    log_info(format!("Building dashboard (profile: {})", request.profile.name));
    let (sources, mut notices) = load_sources(cache, config).await;

    let mut dashboard = build_dashboard(&sources, request);
    notices.append(&mut dashboard.notices);
    dashboard.notices = notices;

    log_info(format!(
        "{} selected rows, {} trend points, {} notices",
        dashboard.table.len(),
        dashboard.trend.len(),
        dashboard.notices.len()
    ));
    dashboard
}

/// Like [`load_dashboard`] but fails on the first source or schema error.
pub async fn load_dashboard_strict<F: SheetFetcher>(
    cache: &SourceCache<F>,
    config: &DashboardConfig,
    request: &DashboardRequest,
) -> DashboardResult<Dashboard> {
    match strict_sources(cache, config, request).await {
        Ok(sources) => Ok(build_dashboard(&sources, request)),
        Err(e) => {
            log_error(format!("Dashboard load failed: {}", e));
            Err(e)
        }
    }
}

async fn strict_sources<F: SheetFetcher>(
    cache: &SourceCache<F>,
    config: &DashboardConfig,
    request: &DashboardRequest,
) -> DashboardResult<SourceSheets> {
    let profile = &request.profile;

    let female = cache.get(&config.sources.female).await?;
    let male = cache.get(&config.sources.male).await?;
    RawTable::from_sheet(&female, &profile.raw_category_header)?;
    RawTable::from_sheet(&male, &profile.raw_category_header)?;

    let fields = match &config.sources.fields {
        Some(url) => {
            let sheet = cache.get(url).await?;
            field_totals(&sheet, &profile.fields)?;
            fields_by_gender(&sheet, &profile.fields)?;
            Some(sheet)
        }
        None => None,
    };

    Ok(SourceSheets {
        female: Some(female),
        male: Some(male),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::logs::{LogLevel, LOG_BROADCASTER};
    use crate::error::{FetchError, FetchResult, SchemaError};
    use crate::parser::{parse_csv, DEFAULT_HEADER_ROW};
    use std::collections::HashMap;
    use tokio::sync::broadcast::error::TryRecvError;

    const FEMALE: &str = "Table 21\nFemale doctorate recipients\n(Number)\n\
        \"Ethnicity, race, and citizenship status\",2014,2015,2016,2017\n\
        All doctorate recipients,100,110,120,130\n\
        U.S. citizen or permanent resident,80,85,90,95\n\
        Hispanic or Latino,10,11,12,13\n\
        Not Hispanic or Latino,60,61,62,63\n\
        Asian,20,21,22,23\n\
        Temporary visa holder,20,25,30,35\n";

    const MALE: &str = "Table 20\nMale doctorate recipients\n(Number)\n\
        \"Ethnicity, race, and citizenship status\",2014,2015,2016,2017\n\
        All doctorate recipients,200,210,220,230\n\
        U.S. citizen or permanent resident,150,155,160,165\n\
        Hispanic or Latino,15,16,17,18\n\
        Asian,30,31,32,33\n";

    const FIELDS: &str = "Table 54\nFields\n(Number and percent)\n\
        Characteristic,Life sciences,Engineering\n\
        All doctorate recipients (number)c,12565,10188\n\
        Female doctorate recipients (number),7000,2500\n\
        Male doctorate recipients (number),5500,7600\n\
        Male,43.8,75.2\n\
        Female,56.2,24.8\n";

    fn sheet(csv: &str) -> Option<Arc<Sheet>> {
        Some(Arc::new(parse_csv(csv, ',', DEFAULT_HEADER_ROW).unwrap()))
    }

    fn sources() -> SourceSheets {
        SourceSheets {
            female: sheet(FEMALE),
            male: sheet(MALE),
            fields: sheet(FIELDS),
        }
    }

    #[test]
    fn test_default_dashboard() {
        let dashboard = build_dashboard(&sources(), &DashboardRequest::default());

        assert_eq!(dashboard.category_label, "Race_Ethnicity");
        assert_eq!(dashboard.years, vec![2014, 2015, 2016, 2017]);
        assert_eq!(dashboard.selected_year, Some(2017));
        assert_eq!(dashboard.genders, vec![Gender::Female, Gender::Male]);
        assert_eq!(
            dashboard.categories,
            vec!["All doctorate recipients", "Hispanic or Latino", "Asian"]
        );
        // 3 female rows + 3 male rows survive the filter
        assert_eq!(dashboard.table.len(), 6);
        assert!(dashboard.notices.is_empty(), "{:?}", dashboard.notices);
    }

    #[test]
    fn test_trend_is_female_then_male() {
        let dashboard = build_dashboard(&sources(), &DashboardRequest::default());
        let trend = &dashboard.trend;
        assert_eq!(trend.len(), 8);
        assert!(trend.records[..4].iter().all(|r| r.gender == Gender::Female));
        assert!(trend.records[4..].iter().all(|r| r.gender == Gender::Male));
        assert!(trend.iter().all(|r| r.category == ALL_RECIPIENTS));
    }

    #[test]
    fn test_fixed_summary() {
        let dashboard = build_dashboard(&sources(), &DashboardRequest::default());
        assert_eq!(dashboard.summary.len(), 2);
        let female = &dashboard.summary[0];
        assert_eq!((female.min, female.max), (100, 130));
        assert_eq!(female.mean, 115.0);
        assert_eq!(female.median, 115.0);
        assert_eq!(dashboard.summary[1].max, 230);
    }

    #[test]
    fn test_selection_scenario() {
        let request = DashboardRequest {
            selection: Selection {
                year: Some(2015),
                genders: Some(vec![Gender::Female]),
                categories: Some(vec![ALL_RECIPIENTS.to_string()]),
            },
            ..Default::default()
        };
        let dashboard = build_dashboard(&sources(), &request);
        assert_eq!(dashboard.table.len(), 1);
        assert_eq!(dashboard.table.rows[0].values, vec![Some(110)]);
    }

    #[test]
    fn test_selection_scope_summary() {
        let request = DashboardRequest {
            selection: Selection {
                year: None,
                genders: Some(vec![Gender::Male]),
                categories: Some(vec!["Asian".to_string()]),
            },
            scope: SummaryScope::Selection,
            ..Default::default()
        };
        let dashboard = build_dashboard(&sources(), &request);
        assert_eq!(dashboard.summary.len(), 1);
        assert_eq!(dashboard.summary[0].gender, Gender::Male);
        assert_eq!(dashboard.summary[0].min, 30);
    }

    #[test]
    fn test_race_profile() {
        let request = DashboardRequest {
            profile: ReshapeProfile::race(),
            ..Default::default()
        };
        let dashboard = build_dashboard(&sources(), &request);
        assert_eq!(dashboard.category_label, "Race");
        assert_eq!(dashboard.categories, vec!["All doctorate recipients", "Asian"]);
    }

    #[test]
    fn test_empty_selection_is_notice() {
        let request = DashboardRequest {
            selection: Selection {
                genders: Some(vec![]),
                ..Default::default()
            },
            ..Default::default()
        };
        let dashboard = build_dashboard(&sources(), &request);
        assert!(dashboard.table.is_empty());
        assert!(dashboard
            .notices
            .iter()
            .any(|n| n.kind == NoticeKind::EmptyInput && n.source == "selection"));
    }

    #[test]
    fn test_schema_error_is_empty_state() {
        let mut broken = sources();
        broken.male = sheet("t\nt\nt\nRace,2016\nAsian,1\n");
        let dashboard = build_dashboard(&broken, &DashboardRequest::default());

        assert_eq!(dashboard.genders, vec![Gender::Female]);
        assert_eq!(dashboard.summary[1], SummaryRow::empty(Gender::Male));
        let kinds: Vec<NoticeKind> = dashboard.notices.iter().map(|n| n.kind).collect();
        assert!(kinds.contains(&NoticeKind::Schema));
        assert!(kinds.contains(&NoticeKind::EmptyInput));
    }

    #[test]
    fn test_no_sources() {
        let dashboard = build_dashboard(&SourceSheets::default(), &DashboardRequest::default());
        assert!(dashboard.years.is_empty());
        assert_eq!(dashboard.selected_year, None);
        assert!(dashboard.trend.is_empty());
        assert_eq!(dashboard.summary.len(), 2);
        assert!(dashboard.fields.is_empty());
    }

    #[test]
    fn test_fields() {
        let dashboard = build_dashboard(&sources(), &DashboardRequest::default());
        assert_eq!(dashboard.fields.len(), 2);
        assert_eq!(dashboard.fields[1].value, 10188.0);
        assert_eq!(dashboard.fields_by_gender[1].male, 75.2);
    }

    #[test]
    fn test_profile_by_name() {
        assert_eq!(ReshapeProfile::by_name("race"), Some(ReshapeProfile::race()));
        assert_eq!(
            ReshapeProfile::by_name("Race_Ethnicity"),
            Some(ReshapeProfile::race_ethnicity())
        );
        assert!(ReshapeProfile::by_name("gender").is_none());
    }

    struct MapFetcher(HashMap<String, &'static str>);

    impl SheetFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> FetchResult<Vec<u8>> {
            self.0
                .get(url)
                .map(|s| s.as_bytes().to_vec())
                .ok_or_else(|| FetchError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    fn config() -> DashboardConfig {
        let mut config = DashboardConfig::default();
        config.sources.female = "f".into();
        config.sources.male = "m".into();
        config.sources.fields = Some("x".into());
        config
    }

    #[tokio::test]
    async fn test_load_dashboard_reports_fetch_failure() {
        let mut map = HashMap::new();
        map.insert("f".to_string(), FEMALE);
        map.insert("m".to_string(), MALE);
        let cache = SourceCache::new(MapFetcher(map), DEFAULT_HEADER_ROW);

        let dashboard = load_dashboard(&cache, &config(), &DashboardRequest::default()).await;
        assert_eq!(dashboard.trend.len(), 8);
        assert!(dashboard.fields.is_empty());
        assert_eq!(dashboard.notices.len(), 1);
        assert_eq!(dashboard.notices[0].kind, NoticeKind::Fetch);
        assert_eq!(dashboard.notices[0].source, "fields");
    }

    #[tokio::test]
    async fn test_load_dashboard_strict_rejects_field_schema() {
        let mut map = HashMap::new();
        map.insert("f".to_string(), FEMALE);
        map.insert("m".to_string(), MALE);
        map.insert("x".to_string(), "t\nt\nt\nField,Life sciences\nAll,12565\n");
        let cache = SourceCache::new(MapFetcher(map), DEFAULT_HEADER_ROW);
        let mut logs = LOG_BROADCASTER.subscribe();

        let err = load_dashboard_strict(&cache, &config(), &DashboardRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Schema(SchemaError::MissingCategoryColumn { .. })
        ));

        let mut saw_error = false;
        loop {
            match logs.try_recv() {
                Ok(entry) => {
                    saw_error |= entry.level == LogLevel::Error
                        && entry.message.contains("Missing category column 'Characteristic'");
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        assert!(saw_error);

        // The lenient loader keeps going with a notice instead
        let dashboard = load_dashboard(&cache, &config(), &DashboardRequest::default()).await;
        assert!(dashboard.fields.is_empty());
        assert!(dashboard
            .notices
            .iter()
            .any(|n| n.kind == NoticeKind::Schema && n.source == "fields"));
    }

    #[tokio::test]
    async fn test_load_dashboard_strict_rejects_missing_gender_rows() {
        let mut map = HashMap::new();
        map.insert("f".to_string(), FEMALE);
        map.insert("m".to_string(), MALE);
        map.insert("x".to_string(), "t\nt\nt\nCharacteristic,Life sciences\nAll,12565\n");
        let cache = SourceCache::new(MapFetcher(map), DEFAULT_HEADER_ROW);

        let err = load_dashboard_strict(&cache, &config(), &DashboardRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Schema(SchemaError::MissingRow { .. })));
    }

    #[tokio::test]
    async fn test_load_dashboard_strict_ok() {
        let mut map = HashMap::new();
        map.insert("f".to_string(), FEMALE);
        map.insert("m".to_string(), MALE);
        map.insert("x".to_string(), FIELDS);
        let cache = SourceCache::new(MapFetcher(map), DEFAULT_HEADER_ROW);

        let dashboard = load_dashboard_strict(&cache, &config(), &DashboardRequest::default())
            .await
            .unwrap();
        assert_eq!(dashboard.fields.len(), 2);
        assert!(dashboard.notices.is_empty());
    }

    #[tokio::test]
    async fn test_load_dashboard_strict_fails() {
        let mut map = HashMap::new();
        map.insert("f".to_string(), FEMALE);
        let cache = SourceCache::new(MapFetcher(map), DEFAULT_HEADER_ROW);

        let err = load_dashboard_strict(&cache, &config(), &DashboardRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Fetch(_)));
    }
}
