// src/server.rs

//! Local web dashboard and JSON API.

use crate::analyzer::{
    daily_stats, domain_stats, filtered_visits, hierarchical_domain_stats, hourly_stats, recent_visits,
    recent_visits_page, total_visits,
};
use crate::cli::parse_date;
use crate::error::HistError;
use crate::model::*;
use crate::renderer::{bar, display_title, truncate};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

pub const PAGE_SIZE: usize = 50;
pub const DASHBOARD_RECENT_VISITS: usize = 5;
pub const DASHBOARD_DOMAINS: usize = 10;
pub const DEFAULT_DAILY_DAYS: u32 = 30;

const STYLESHEET: &str = "\
body { font-family: -apple-system, sans-serif; margin: 2rem auto; max-width: 960px; color: #222; }
h1 { font-size: 1.6rem; }
table { border-collapse: collapse; width: 100%; }
td, th { padding: 4px 8px; border-bottom: 1px solid #eee; text-align: left; }
.bar { color: #3b82f6; font-family: monospace; }
.muted { color: #888; }
.sub td:first-child { padding-left: 2rem; }
nav a { margin-right: 1rem; }
";

/// Renders HTML pages and serves static assets for the dashboard.
#[derive(Debug, Clone)]
pub struct Pages {
    stylesheet: &'static str,
}

impl Default for Pages {
    fn default() -> Self {
        Self { stylesheet: STYLESHEET }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

impl Pages {
    pub fn stylesheet(&self) -> &'static str {
        self.stylesheet
    }

    fn layout(&self, title: &str, body: &str) -> String {
        format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
             <link rel=\"stylesheet\" href=\"/static/style.css\"></head>\
             <body><nav><a href=\"/\">Dashboard</a><a href=\"/history\">History</a></nav>{body}</body></html>\n",
            title = escape_html(title),
        )
    }

    fn visit_rows(&self, visits: &[Visit]) -> String {
        let mut rows = String::new();
        for v in visits {
            let _ = write!(
                rows,
                "<tr><td>{}</td><td><a href=\"{}\">{}</a></td><td class=\"muted\">{}</td></tr>",
                v.visit_time.format("%Y-%m-%d %H:%M:%S"),
                escape_html(&v.url),
                escape_html(&truncate(display_title(&v.title), 80)),
                escape_html(&v.domain),
            );
        }
        rows
    }

    pub fn dashboard(&self, data: &DashboardData) -> String {
        let mut body = String::new();
        let _ = write!(body, "<h1>Safari history</h1><p>Total visits: <strong>{}</strong></p>", data.total_visits);

        body.push_str("<h2>Top domains</h2><table>");
        let max = data.domain_stats.first().map_or(0, |s| s.visit_count);
        for s in &data.domain_stats {
            let _ = write!(
                body,
                "<tr><td>{}</td><td class=\"bar\">{}</td><td>{}</td></tr>",
                escape_html(&s.domain),
                bar(s.visit_count, max),
                s.visit_count
            );
        }
        body.push_str("</table>");

        body.push_str("<h2>By base domain</h2><table>");
        for bucket in &data.hierarchical_stats {
            let _ = write!(
                body,
                "<tr><td><strong>{}</strong></td><td>{}</td></tr>",
                escape_html(&bucket.base_domain),
                bucket.total_count
            );
            if bucket.has_subdomains {
                for sub in &bucket.subdomains {
                    let _ = write!(
                        body,
                        "<tr class=\"sub\"><td>{}</td><td>{}</td></tr>",
                        escape_html(&sub.subdomain),
                        sub.count
                    );
                }
            }
        }
        body.push_str("</table>");

        body.push_str("<h2>Recent visits</h2><table>");
        body.push_str(&self.visit_rows(&data.recent_visits));
        body.push_str("</table>");

        self.layout("Safari history", &body)
    }

    pub fn history(&self, data: &HistoryPageData) -> String {
        let mut body = String::new();
        let _ = write!(
            body,
            "<h1>History</h1><p class=\"muted\">{} matching visits, page {} of {}</p><table>",
            data.matching, data.current_page, data.total_pages
        );
        body.push_str(&self.visit_rows(&data.visits));
        body.push_str("</table><nav>");
        if data.current_page > 1 {
            let _ = write!(body, "<a href=\"/history?page={}{}\">Prev</a>", data.current_page - 1, data.query_suffix);
        }
        if data.current_page < data.total_pages {
            let _ = write!(body, "<a href=\"/history?page={}{}\">Next</a>", data.current_page + 1, data.query_suffix);
        }
        body.push_str("</nav>");
        self.layout("History", &body)
    }
}

pub struct DashboardData {
    pub total_visits: u64,
    pub domain_stats: Vec<DomainStats>,
    pub hierarchical_stats: Vec<HierarchicalDomainStats>,
    pub recent_visits: Vec<Visit>,
}

pub struct HistoryPageData {
    pub visits: Vec<Visit>,
    pub matching: u64,
    pub current_page: usize,
    pub total_pages: usize,
    /// Filter parameters carried into the prev/next links
    pub query_suffix: String,
}

#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    ignore_domains: Arc<Vec<String>>,
    pages: Arc<Pages>,
}

impl AppState {
    pub fn new(conn: Connection, ignore_domains: Vec<String>, pages: Pages) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            ignore_domains: Arc::new(ignore_domains),
            pages: Arc::new(pages),
        }
    }

    /// Runs `f` against the store on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Connection) -> crate::error::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| ApiError::Internal("history database lock poisoned".into()))?;
            f(&conn).map_err(ApiError::from)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
    }

    fn base_filter(&self) -> SearchFilter {
        SearchFilter {
            ignore_domains: self.ignore_domains.to_vec(),
            ..Default::default()
        }
    }
}

#[derive(Serialize)]
struct ErrResponse {
    error: String,
}

/// Handler failure mapped onto an HTTP response.
pub enum ApiError {
    Hist(HistError),
    Internal(String),
}

impl From<HistError> for ApiError {
    fn from(err: HistError) -> Self {
        Self::Hist(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Hist(HistError::InvalidDate(date)) => {
                (StatusCode::BAD_REQUEST, HistError::InvalidDate(date).to_string())
            }
            ApiError::Hist(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        if status.is_server_error() {
            error!("request failed: {message}");
        }
        (status, Json(ErrResponse { error: message })).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Query parameters accepted by the history endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    page: Option<usize>,
    limit: Option<usize>,
    offset: Option<usize>,
    #[serde(default)]
    q: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
}

impl HistoryParams {
    fn to_filter(&self, ignore_domains: &[String]) -> crate::error::Result<SearchFilter> {
        let date = |s: &str| if s.is_empty() { Ok(None) } else { parse_date(s).map(Some) };
        Ok(SearchFilter {
            keyword: self.q.clone(),
            domain: self.domain.clone(),
            from: date(&self.from)?,
            to: date(&self.to)?,
            ignore_domains: ignore_domains.to_vec(),
        })
    }

    fn query_suffix(&self) -> String {
        [("q", &self.q), ("domain", &self.domain), ("from", &self.from), ("to", &self.to)]
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("&amp;{k}={}", urlencoding::encode(v)))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct DailyParams {
    days: Option<u32>,
}

#[derive(Serialize)]
struct StatsResponse {
    total_visits: u64,
    domain_stats: Vec<DomainStats>,
    hierarchical_stats: Vec<HierarchicalDomainStats>,
    hourly_stats: Vec<HourlyStats>,
}

async fn dashboard(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let filter = state.base_filter();
    let data = state
        .with_conn(move |conn| {
            Ok(DashboardData {
                total_visits: total_visits(conn)?,
                domain_stats: domain_stats(conn, DASHBOARD_DOMAINS, &filter)?,
                hierarchical_stats: hierarchical_domain_stats(conn, DASHBOARD_DOMAINS, Some(5), &filter)?,
                recent_visits: recent_visits(conn, DASHBOARD_RECENT_VISITS, &filter)?,
            })
        })
        .await?;
    Ok(Html(state.pages.dashboard(&data)))
}

async fn history_page(State(state): State<AppState>, Query(params): Query<HistoryParams>) -> ApiResult<Html<String>> {
    let filter = params.to_filter(&state.ignore_domains)?;
    let requested = params.page.unwrap_or(1);

    let (matching, total_pages, page, visits) = state
        .with_conn(move |conn| {
            let matching = filtered_visits(conn, &filter)?;
            let total_pages = usize::try_from(matching).unwrap_or(usize::MAX).div_ceil(PAGE_SIZE).max(1);
            let page = requested.clamp(1, total_pages);
            let visits = recent_visits_page(conn, PAGE_SIZE, (page - 1).saturating_mul(PAGE_SIZE), &filter)?;
            Ok((matching, total_pages, page, visits))
        })
        .await?;

    let data = HistoryPageData {
        visits,
        matching,
        current_page: page,
        total_pages,
        query_suffix: params.query_suffix(),
    };
    Ok(Html(state.pages.history(&data)))
}

async fn api_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let filter = state.base_filter();
    let stats = state
        .with_conn(move |conn| {
            Ok(StatsResponse {
                total_visits: total_visits(conn)?,
                domain_stats: domain_stats(conn, DASHBOARD_DOMAINS, &filter)?,
                hierarchical_stats: hierarchical_domain_stats(conn, DASHBOARD_DOMAINS, None, &filter)?,
                hourly_stats: hourly_stats(conn, &filter)?,
            })
        })
        .await?;
    Ok(Json(stats))
}

async fn api_history(State(state): State<AppState>, Query(params): Query<HistoryParams>) -> ApiResult<Json<Vec<Visit>>> {
    let filter = params.to_filter(&state.ignore_domains)?;
    let limit = params.limit.filter(|l| *l > 0).unwrap_or(PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);
    let visits = state
        .with_conn(move |conn| recent_visits_page(conn, limit, offset, &filter))
        .await?;
    Ok(Json(visits))
}

async fn api_daily(State(state): State<AppState>, Query(params): Query<DailyParams>) -> ApiResult<Json<Vec<DailyStats>>> {
    let filter = state.base_filter();
    let days = params.days.unwrap_or(DEFAULT_DAILY_DAYS);
    let stats = state.with_conn(move |conn| daily_stats(conn, days, &filter)).await?;
    Ok(Json(stats))
}

async fn stylesheet(State(state): State<AppState>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], state.pages.stylesheet())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/history", get(history_page))
        .route("/api/stats", get(api_stats))
        .route("/api/history", get(api_history))
        .route("/api/daily", get(api_daily))
        .route("/static/style.css", get(stylesheet))
        .with_state(state)
}

/// Serves the dashboard on 127.0.0.1:`port` until the process is stopped.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("web dashboard listening on http://{addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::seeded_db;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(ignore: &[&str]) -> Router {
        let ignore = ignore.iter().map(|s| s.to_string()).collect();
        router(AppState::new(seeded_db(), ignore, Pages::default()))
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app.oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn dashboard_lists_totals_and_domains() {
        let (status, body) = get_body(app(&[]), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Total visits: <strong>5</strong>"));
        assert!(body.contains("youtube.com"));
        assert!(body.contains("YouTube - Music"));
    }

    #[tokio::test]
    async fn dashboard_applies_ignore_list() {
        let (_, body) = get_body(app(&["youtube.com"]), "/").await;
        assert!(!body.contains("<td>youtube.com</td>"));
        assert!(body.contains("github.com"));
    }

    #[tokio::test]
    async fn api_history_filters_by_keyword() {
        let (status, body) = get_body(app(&[]), "/api/history?q=GitHub&limit=10").await;
        assert_eq!(status, StatusCode::OK);
        let visits: Vec<Visit> = serde_json::from_str(&body).unwrap();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].title, "GitHub - Another Page");
    }

    #[tokio::test]
    async fn api_history_rejects_bad_dates() {
        let (status, body) = get_body(app(&[]), "/api/history?from=01-01-2025").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("invalid date"));
    }

    #[tokio::test]
    async fn api_stats_has_24_hours() {
        let (status, body) = get_body(app(&[]), "/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["total_visits"], 5);
        assert_eq!(json["hourly_stats"].as_array().unwrap().len(), 24);
        assert_eq!(json["domain_stats"][0]["domain"], "youtube.com");
    }

    #[tokio::test]
    async fn history_page_paginates_on_filtered_count() {
        let (status, body) = get_body(app(&[]), "/history?q=youtube").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("2 matching visits, page 1 of 1"));
        assert!(!body.contains("Next</a>"));
    }

    #[tokio::test]
    async fn history_page_clamps_out_of_range_pages() {
        let (status, body) = get_body(app(&[]), "/history?page=18446744073709551615").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("5 matching visits, page 1 of 1"));

        let (status, body) = get_body(app(&[]), "/history?page=0").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("page 1 of 1"));
    }

    #[tokio::test]
    async fn api_history_tolerates_huge_offsets() {
        let (status, body) = get_body(app(&[]), "/api/history?offset=18446744073709551615").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn stylesheet_is_served() {
        let response = app(&[])
            .oneshot(Request::get("/static/style.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css; charset=utf-8");
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn page_links_carry_encoded_filters() {
        let params = HistoryParams {
            q: "a b&c".into(),
            from: "2025-01-01".into(),
            ..Default::default()
        };
        assert_eq!(params.query_suffix(), "&amp;q=a%20b%26c&amp;from=2025-01-01");
    }
}
