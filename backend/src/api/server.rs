//! HTTP server for the doctorate dashboard.
//!
//! Every data endpoint evaluates the dashboard for the query's selection.
//! Sources are fetched through a shared [`SourceCache`], so only the first
//! request per table touches the network.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check and cached sources      |
//! | GET    | `/api/dashboard`  | Full dashboard                       |
//! | GET    | `/api/table`      | Selection table                      |
//! | GET    | `/api/trend`      | Trend series (female then male)      |
//! | GET    | `/api/summary`    | Per-gender summary statistics        |
//! | GET    | `/api/fields`     | Field-of-study totals and pairs      |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::logs::LOG_BROADCASTER;
use super::types::{error_response, DashboardQuery, DashboardResponse, SectionResponse};
use crate::cache::SourceCache;
use crate::config::DashboardConfig;
use crate::error::{ServerError, ServerResult};
use crate::fetch::HttpFetcher;
use crate::models::{FieldByGender, FieldCount, SummaryRow, TidyTable, WideTable};
use crate::transform::pipeline::{load_dashboard, Dashboard};

type ApiError = (StatusCode, Json<Value>);

/// Decoded query pairs; keeps repeated `category` parameters
type QueryPairs = Query<Vec<(String, String)>>;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SourceCache<HttpFetcher>>,
    pub config: Arc<DashboardConfig>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> ServerResult<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout(), config.fetch_attempts)
            .map_err(|e| ServerError::Dashboard(e.into()))?;
        Ok(Self {
            cache: Arc::new(SourceCache::new(fetcher, config.header_row)),
            config: Arc::new(config),
        })
    }
}

/// Field-of-study section payload
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsPayload {
    pub totals: Vec<FieldCount>,
    pub by_gender: Vec<FieldByGender>,
}

/// Build the router (separate from [`start_server`] so it can be tested)
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/dashboard", get(dashboard))
        .route("/api/table", get(table))
        .route("/api/trend", get(trend))
        .route("/api/summary", get(summary))
        .route("/api/fields", get(fields))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: DashboardConfig) -> ServerResult<()> {
    let port = config.port;
    let app = router(AppState::new(config)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Doctorate dashboard server running on http://localhost:{}", port);
    info!("   GET /api/dashboard - Full dashboard");
    info!("   GET /api/logs      - SSE log stream");
    info!("   GET /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    let cached = state.cache.list().await;
    Json(json!({
        "status": "ok",
        "service": "doctorates",
        "version": env!("CARGO_PKG_VERSION"),
        "cachedSources": cached,
        "endpoints": {
            "dashboard": "GET /api/dashboard",
            "table": "GET /api/table",
            "trend": "GET /api/trend",
            "summary": "GET /api/summary",
            "fields": "GET /api/fields",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// Evaluate the dashboard for a query
async fn evaluate(state: &AppState, pairs: Vec<(String, String)>) -> Result<Dashboard, ApiError> {
    let request = DashboardQuery::from_pairs(pairs)
        .into_request(&state.config.summary_scope)
        .map_err(|e| {
            warn!(error = %e, "rejected dashboard query");
            (
                StatusCode::BAD_REQUEST,
                Json(error_response(&ServerError::BadRequest(e).to_string())),
            )
        })?;
    Ok(load_dashboard(&state.cache, &state.config, &request).await)
}

async fn dashboard(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<DashboardResponse>, ApiError> {
    let dashboard = evaluate(&state, pairs).await?;
    Ok(Json(DashboardResponse::from(dashboard)))
}

async fn table(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<SectionResponse<WideTable>>, ApiError> {
    let dashboard = evaluate(&state, pairs).await?;
    Ok(Json(SectionResponse::from_dashboard(dashboard, |d| d.table)))
}

async fn trend(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<SectionResponse<TidyTable>>, ApiError> {
    let dashboard = evaluate(&state, pairs).await?;
    Ok(Json(SectionResponse::from_dashboard(dashboard, |d| d.trend)))
}

async fn summary(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<SectionResponse<Vec<SummaryRow>>>, ApiError> {
    let dashboard = evaluate(&state, pairs).await?;
    Ok(Json(SectionResponse::from_dashboard(dashboard, |d| d.summary)))
}

async fn fields(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<SectionResponse<FieldsPayload>>, ApiError> {
    let dashboard = evaluate(&state, pairs).await?;
    Ok(Json(SectionResponse::from_dashboard(dashboard, |d| FieldsPayload {
        totals: d.fields,
        by_gender: d.fields_by_gender,
    })))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FEMALE: &str = "t\nt\nt\n\"Ethnicity, race, and citizenship status\",2016,2017\n\
        All doctorate recipients,120,130\nAsian,22,23\n\"White, non-Hispanic\",60,61\n";
    const MALE: &str = "t\nt\nt\n\"Ethnicity, race, and citizenship status\",2016,2017\n\
        All doctorate recipients,220,230\nAsian,32,33\n";

    fn write_source(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        format!("file://{}", path.display())
    }

    fn query(uri: &str) -> QueryPairs {
        Query::try_from_uri(&uri.parse::<axum::http::Uri>().unwrap()).unwrap()
    }

    fn state(dir: &tempfile::TempDir) -> AppState {
        let mut config = DashboardConfig::default();
        config.sources.female = write_source(dir, "female.csv", FEMALE);
        config.sources.male = write_source(dir, "male.csv", MALE);
        config.sources.fields = None;
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_summary_handler() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);

        let Json(response) = summary(State(state.clone()), query("/api/summary"))
            .await
            .unwrap();
        assert_eq!(response.status, "ready");
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[1].max, 230);

        let Json(health) = health(State(state)).await;
        assert_eq!(health["cachedSources"].as_array().unwrap().len(), 2);
        assert_eq!(health["cachedSources"][0]["format"], "csv");
    }

    #[tokio::test]
    async fn test_bad_query_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let (status, Json(body)) = table(State(state(&dir)), query("/api/table?year=soon"))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_table_handler_selection() {
        let dir = tempfile::tempdir().unwrap();
        let Json(response) = table(State(state(&dir)), query("/api/table?year=2016&genders=male"))
            .await
            .unwrap();
        assert_eq!(response.data.years, vec![2016]);
        assert_eq!(response.data.len(), 2);
    }

    #[tokio::test]
    async fn test_category_with_comma() {
        let dir = tempfile::tempdir().unwrap();
        let uri = "/api/table?year=2017&gender=female\
            &category=White%2C%20non-Hispanic&category=Asian";

        let Json(response) = table(State(state(&dir)), query(uri)).await.unwrap();
        assert_eq!(response.status, "ready");
        let categories: Vec<&str> =
            response.data.rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["Asian", "White, non-Hispanic"]);
        assert_eq!(response.data.rows[1].values, vec![Some(61)]);
    }
}
