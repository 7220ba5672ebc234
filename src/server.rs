//! HTTP front for the dashboard.
//!
//! Every request renders from the shared feed cache; only a cache miss
//! touches the upstream feed.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument};

use crate::cache::{CacheStats, FeedCache, load_cached};
use crate::config::Config;
use crate::dashboard::{DashboardState, EXPORT_FILE_NAME, Layers, render, select};
use crate::detection::FireTable;
use crate::error::FeedError;
use crate::fetch::HttpClient;
use crate::filter::available_dates;
use crate::output::export_csv;

/// Application state shared across handlers
pub struct AppState {
    pub feed_url: String,
    pub cache: Arc<FeedCache>,
    pub client: Arc<dyn HttpClient>,
    pub version: String,
}

impl AppState {
    pub fn new(config: &Config, cache: Arc<FeedCache>, client: Arc<dyn HttpClient>) -> Self {
        Self {
            feed_url: config.feed_url.clone(),
            cache,
            client,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn table(&self) -> Result<Arc<FireTable>, ApiError> {
        Ok(load_cached(&self.cache, self.client.as_ref(), &self.feed_url).await?)
    }
}

#[derive(Debug)]
pub enum ApiError {
    Feed(FeedError),
    BadRequest(String),
    Internal(String),
}

impl From<FeedError> for ApiError {
    fn from(e: FeedError) -> Self {
        ApiError::Feed(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Feed(e) => {
                error!(error = %e, "Feed unavailable");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => {
                error!(error = %m, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Query string form of [`DashboardState`].
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub date: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub basemap: Option<String>,
    pub heatmap: Option<bool>,
    pub temperature: Option<bool>,
    pub wind: Option<bool>,
    pub precipitation: Option<bool>,
}

impl ViewQuery {
    pub fn into_state(self) -> Result<DashboardState, ApiError> {
        let defaults = Layers::default();
        Ok(DashboardState {
            province: parse_opt(self.province)?.unwrap_or_default(),
            city: parse_opt(self.city)?.unwrap_or_default(),
            date: parse_opt(self.date)?,
            basemap: parse_opt(self.basemap)?.unwrap_or_default(),
            layers: Layers {
                hotspots: self.heatmap.unwrap_or(defaults.hotspots),
                temperature: self.temperature.unwrap_or(defaults.temperature),
                wind: self.wind.unwrap_or(defaults.wind),
                precipitation: self.precipitation.unwrap_or(defaults.precipitation),
            },
        })
    }
}

fn parse_opt<T>(value: Option<String>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<T>().map_err(|e| ApiError::BadRequest(e.to_string())))
        .transpose()
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub feed_url: String,
    pub cache: CacheStats,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/dates", get(dates_handler))
        .route("/api/export", get(export_handler))
        .route("/api/cache/clear", post(cache_clear_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `config.bind_addr` and serves until the process is stopped.
pub async fn serve(config: &Config, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, feed = %config.feed_url, "Dashboard server listening");
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: state.version.clone(),
        feed_url: state.feed_url.clone(),
        cache: state.cache.stats(),
    })
}

/// GET /api/dashboard - full view for the selection in the query string
#[instrument(skip(state))]
async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let selection = query.into_state()?;
    let table = state.table().await?;
    Ok(Json(render(&table, &selection)))
}

/// GET /api/dates - dates present in the feed, ascending
#[instrument(skip(state))]
async fn dates_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let table = state.table().await?;
    Ok(Json(available_dates(&table)))
}

/// GET /api/export - CSV of the selection, 204 when it is empty
#[instrument(skip(state))]
async fn export_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Response, ApiError> {
    let selection = query.into_state()?;
    let table = state.table().await?;
    let rows = select(&table, &selection);

    let body = export_csv(&rows).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(match body {
        Some(bytes) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// POST /api/cache/clear - drop the cached feed so the next request refetches
#[instrument(skip(state))]
async fn cache_clear_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Clearing feed cache");
    state.cache.clear();
    (StatusCode::OK, "Feed cache cleared")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    const CSV: &str = "latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_t31,frp,daynight\n\
        56.1,-106.2,300.1,1.0,1.0,2024-05-01,1345,Aqua,MODIS,85,6.1NRT,290.1,12.3,D\n\
        55.0,-110.0,310.5,1.0,1.0,2024-05-02,0059,Aqua,MODIS,70,6.1NRT,280.0,8.0,N\n\
        54.0,-112.0,295.0,1.0,1.0,2024-05-02,1301,Terra,MODIS,40,6.1NRT,281.0,3.0,D\n";

    struct FakeFeed {
        status: u16,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for FakeFeed {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let resp = http::Response::builder()
                .status(self.status)
                .body(CSV)
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    fn app(status: u16) -> (Router, Arc<FakeFeed>) {
        let feed = Arc::new(FakeFeed { status, calls: AtomicUsize::new(0) });
        let config = Config {
            feed_url: "http://fixture.test/fires.csv".to_string(),
            ..Config::default()
        };
        let cache = Arc::new(FeedCache::new(Duration::from_secs(60)));
        let state = Arc::new(AppState::new(&config, cache, feed.clone()));
        (create_router(state), feed)
    }

    async fn get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_defaults_to_latest_date() {
        let (router, _) = app(200);
        let resp = get(router, "/api/dashboard").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json(resp).await;
        assert_eq!(body["selected_date"], "2024-05-02");
        assert_eq!(body["status"], "ready");
        assert_eq!(body["kpis"]["count"], 2);
        assert_eq!(body["kpis"]["max_brightness"], 310.5);
        assert_eq!(body["export"], "filtered_fires.csv");
    }

    #[tokio::test]
    async fn test_empty_date_is_ok_not_error() {
        let (router, _) = app(200);
        let resp = get(router, "/api/dashboard?date=2020-01-01").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json(resp).await;
        assert_eq!(body["status"], "empty");
        assert_eq!(body["kpis"]["count"], 0);
        assert!(body["kpis"]["max_brightness"].is_null());
    }

    #[tokio::test]
    async fn test_feed_failure_is_bad_gateway() {
        let (router, _) = app(503);
        let resp = get(router, "/api/dashboard").await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert!(json(resp).await["error"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_bad_selector_is_bad_request() {
        let (router, _) = app(200);
        let resp = get(router, "/api/dashboard?basemap=Stamen").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_csv_download() {
        let (router, _) = app(200);
        let resp = get(router, "/api/export?date=2024-05-02").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"filtered_fires.csv\""
        );

        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap().lines().count(), 3);
    }

    #[tokio::test]
    async fn test_export_empty_is_no_content() {
        let (router, _) = app(200);
        let resp = get(router, "/api/export?date=2020-01-01").await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_requests_share_cached_feed() {
        let (router, feed) = app(200);
        get(router.clone(), "/api/dashboard").await;
        get(router.clone(), "/api/dates").await;
        get(router, "/api/export").await;

        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_clear_forces_refetch() {
        let (router, feed) = app(200);
        get(router.clone(), "/api/dates").await;
        let resp = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/cache/clear")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        get(router, "/api/dates").await;

        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    }
}
