//! meetlog-api - HTTP API server for meetlog

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use meetlog_core::{
    defaults, validate, Error, Note, NoteDraft, NoteFilter, NoteRepository, ValidationErrors,
};
use meetlog_db::{log_pool_metrics, Database};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful for
/// log correlation and debugging production incidents.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    /// Database handle; None when startup ran in degraded mode.
    db: Option<Database>,
    /// Global rate limiter (None if rate limiting is disabled).
    rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    /// The live database handle, or a 503 when the store was unreachable at
    /// startup.
    fn db(&self) -> Result<&Database, ApiError> {
        self.db.as_ref().ok_or_else(|| {
            ApiError::Unavailable(
                "The database was unreachable at startup; restart the service once it is back"
                    .to_string(),
            )
        })
    }
}

// =============================================================================
// RESPONSE ENVELOPES
// =============================================================================

/// Pagination metadata for the listing endpoint.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// The requested page (1-based).
    pub current_page: i64,
    /// ceil(totalItems / itemsPerPage); 0 when nothing matches.
    pub total_pages: i64,
    /// Total number of items matching the filter (across all pages).
    pub total_items: i64,
    /// Maximum number of items per page (request parameter).
    pub items_per_page: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationMeta {
    /// Compute metadata from the requested page, the page size, and the true
    /// total. A page beyond the last is legal: the metadata still reflects
    /// the real total and `has_next_page` is false.
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            current_page: page,
            total_pages,
            total_items: total,
            items_per_page: limit,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// Listing response envelope: one page of notes plus pagination metadata.
#[derive(Serialize, Debug)]
struct NotesPage {
    notes: Vec<Note>,
    pagination: PaginationMeta,
}

impl NotesPage {
    fn new(notes: Vec<Note>, page: i64, limit: i64, total: i64) -> Self {
        Self {
            notes,
            pagination: PaginationMeta::new(page, limit, total),
        }
    }
}

/// Search response envelope: the full match set, never paginated.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SearchResults {
    notes: Vec<Note>,
    search_query: String,
    total_results: usize,
}

// =============================================================================
// CORS CONFIGURATION HELPER
// =============================================================================

/// Parse allowed origins from the comma-separated `ALLOWED_ORIGINS`
/// environment variable, falling back to the development frontend origin.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str =
        std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| defaults::ALLOWED_ORIGIN.to_string());
    parse_origin_list(&origins_str)
}

fn parse_origin_list(origins_str: &str) -> Vec<HeaderValue> {
    if origins_str.trim().is_empty() {
        return vec![HeaderValue::from_static(defaults::ALLOWED_ORIGIN)];
    }

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// STARTUP
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "meetlog_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "meetlog_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("meetlog-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| defaults::DATABASE_URL.to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| defaults::SERVER_PORT.to_string())
        .parse()
        .unwrap_or(defaults::SERVER_PORT);

    // Rate limiting configuration
    // RATE_LIMIT_REQUESTS: requests per period (default: 100)
    // RATE_LIMIT_PERIOD_SECS: period in seconds (default: 900 = 15 minutes)
    let rate_limit_requests: u64 = std::env::var("RATE_LIMIT_REQUESTS")
        .unwrap_or_else(|_| defaults::RATE_LIMIT_REQUESTS.to_string())
        .parse()
        .unwrap_or(defaults::RATE_LIMIT_REQUESTS);
    let rate_limit_period_secs: u64 = std::env::var("RATE_LIMIT_PERIOD_SECS")
        .unwrap_or_else(|_| defaults::RATE_LIMIT_PERIOD_SECS.to_string())
        .parse()
        .unwrap_or(defaults::RATE_LIMIT_PERIOD_SECS);
    let rate_limit_enabled: bool = std::env::var("RATE_LIMIT_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    info!(
        "Rate limiting: {} ({} requests per {} seconds)",
        if rate_limit_enabled {
            "enabled"
        } else {
            "disabled"
        },
        rate_limit_requests,
        rate_limit_period_secs
    );

    // Connect to database. A connection failure is not fatal: the server
    // keeps serving and every store-touching request answers 503 until the
    // process is restarted with a reachable database.
    info!("Connecting to database...");
    let db = match Database::connect(&database_url).await {
        Ok(db) => {
            info!("Database connected");
            info!("Running database migrations...");
            db.migrate().await?;
            info!("Database migrations complete");
            Some(db)
        }
        Err(err) => {
            warn!(
                error = %err,
                "Database unavailable, continuing in degraded mode"
            );
            None
        }
    };

    // Periodic pool health logging
    if let Some(db) = &db {
        let pool = db.pool.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                log_pool_metrics(&pool);
            }
        });
    }

    // Create rate limiter if enabled
    let rate_limiter = if rate_limit_enabled {
        let quota = Quota::with_period(Duration::from_secs(rate_limit_period_secs))
            .ok_or_else(|| anyhow::anyhow!("Rate limit period must be non-zero"))?
            .allow_burst(
                NonZeroU32::new(rate_limit_requests as u32)
                    .ok_or_else(|| anyhow::anyhow!("Rate limit must be non-zero"))?,
            );
        Some(Arc::new(RateLimiter::direct(quota)))
    } else {
        None
    };

    let state = AppState { db, rate_limiter };

    // Build router
    let app = Router::new()
        // Service banner and health check
        .route("/", get(service_index))
        .route("/health", get(health_check))
        .route("/favicon.ico", get(favicon))
        // Notes CRUD
        .route("/api/notes", get(list_notes).post(create_note))
        .route("/api/notes/search", get(search_notes))
        .route(
            "/api/notes/:id",
            get(get_note).put(update_note).delete(delete_note),
        )
        // Rate limiting status endpoint
        .route("/api/rate-limit/status", get(rate_limit_status))
        .fallback(route_not_found)
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            let allowed_origins = parse_allowed_origins();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(Duration::from_secs(3600))
        })
        .layer(RequestBodyLimitLayer::new(defaults::BODY_LIMIT_BYTES))
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    // If rate limiting is disabled, pass through
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            warn!("Rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "Too many requests",
                    "message": "Rate limit exceeded. Please wait before retrying."
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}

/// Get rate limiting status.
async fn rate_limit_status(State(state): State<AppState>) -> impl IntoResponse {
    if state.rate_limiter.is_some() {
        Json(serde_json::json!({
            "enabled": true,
            "message": "Rate limiting is active"
        }))
    } else {
        Json(serde_json::json!({
            "enabled": false,
            "message": "Rate limiting is disabled"
        }))
    }
}

// =============================================================================
// SERVICE ENDPOINTS
// =============================================================================

async fn service_index() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "OK",
        "message": "Meetlog API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "notes": "/api/notes",
            "search": "/api/notes/search"
        },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn route_not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Route not found",
            "message": format!("Cannot {} {}", method, uri.path()),
        })),
    )
}

// =============================================================================
// NOTE HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListNotesQuery {
    page: Option<i64>,
    limit: Option<i64>,
    company_name: Option<String>,
    subject: Option<String>,
    /// Exact-match calendar date, `YYYY-MM-DD`.
    date: Option<String>,
    participants: Option<String>,
}

/// An absent filter and an empty one behave the same.
fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<ListNotesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.unwrap_or(defaults::PAGE);
    if page < 1 {
        return Err(ApiError::BadRequest("page must be >= 1".into()));
    }
    let limit = query.limit.unwrap_or(defaults::PAGE_LIMIT);
    if limit < 1 {
        return Err(ApiError::BadRequest("limit must be >= 1".into()));
    }
    let limit = limit.min(defaults::PAGE_LIMIT_MAX);

    let date = match query.date.as_deref() {
        Some(raw) if !raw.is_empty() => Some(raw.parse::<NaiveDate>().map_err(|_| {
            ApiError::BadRequest(format!(
                "date must be a valid calendar date (YYYY-MM-DD), got \"{raw}\""
            ))
        })?),
        _ => None,
    };

    let filter = NoteFilter {
        company_name: none_if_empty(query.company_name),
        subject: none_if_empty(query.subject),
        date,
        participants: none_if_empty(query.participants),
    };

    let db = state.db()?;
    let total = db.notes.count(&filter).await?;
    let offset = (page - 1).saturating_mul(limit);
    let notes = db.notes.list(&filter, limit, offset).await?;

    Ok(Json(NotesPage::new(notes, page, limit, total)))
}

#[derive(Debug, Deserialize)]
struct SearchNotesQuery {
    q: Option<String>,
}

async fn search_notes(
    State(state): State<AppState>,
    Query(query): Query<SearchNotesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let q = query.q.unwrap_or_default();
    if q.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Please provide a search query parameter \"q\"".into(),
        ));
    }

    let db = state.db()?;
    let notes = db.notes.search(&q).await?;

    Ok(Json(SearchResults {
        total_results: notes.len(),
        search_query: q,
        notes,
    }))
}

async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.db()?.notes.fetch(id).await?;
    Ok(Json(note))
}

async fn create_note(
    State(state): State<AppState>,
    Json(draft): Json<NoteDraft>,
) -> Result<impl IntoResponse, ApiError> {
    // Boundary validation: reject before any store call. The repository
    // runs the same checks again on its side.
    validate(&draft).map_err(ApiError::Validation)?;

    let note = state.db()?.notes.insert(draft).await?;
    info!(note_id = note.id, "Note created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Note created successfully",
            "note": note,
        })),
    ))
}

async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<NoteDraft>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&draft).map_err(ApiError::Validation)?;

    let note = state.db()?.notes.update(id, draft).await?;
    info!(note_id = note.id, "Note updated");

    Ok(Json(serde_json::json!({
        "message": "Note updated successfully",
        "note": note,
    })))
}

async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.db()?.notes.delete(id).await?;
    info!(note_id = id, "Note deleted");

    // The deleted snapshot lets clients confirm what was removed.
    Ok(Json(serde_json::json!({
        "message": "Note deleted successfully",
        "note": note,
    })))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Database(Error),
    NotFound(String),
    BadRequest(String),
    Validation(ValidationErrors),
    Unavailable(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NoteNotFound(id) => ApiError::NotFound(format!("No note found with id {id}")),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Validation(errors) => ApiError::Validation(errors),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error, message) = match self {
            ApiError::Database(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Store error",
                err.to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "Note not found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", msg),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation error",
                errors.to_string(),
            ),
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable", msg)
            }
        };

        let body = Json(serde_json::json!({
            "error": error,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_meta_first_of_three_pages() {
        // 25 matching records, limit 10.
        let meta = PaginationMeta::new(1, 10, 25);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.total_items, 25);
        assert_eq!(meta.items_per_page, 10);
        assert!(meta.has_next_page);
        assert!(!meta.has_prev_page);
    }

    #[test]
    fn test_pagination_meta_last_page() {
        let meta = PaginationMeta::new(3, 10, 25);
        assert!(!meta.has_next_page);
        assert!(meta.has_prev_page);
        assert_eq!(meta.current_page, 3);
    }

    #[test]
    fn test_pagination_meta_exact_multiple() {
        let meta = PaginationMeta::new(2, 10, 20);
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next_page);
    }

    #[test]
    fn test_pagination_meta_empty_set() {
        let meta = PaginationMeta::new(1, 10, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next_page);
        assert!(!meta.has_prev_page);
    }

    #[test]
    fn test_pagination_meta_page_beyond_last() {
        // No error: metadata still reflects the true total.
        let meta = PaginationMeta::new(7, 10, 25);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.current_page, 7);
        assert!(!meta.has_next_page);
        assert!(meta.has_prev_page);
    }

    #[test]
    fn test_pagination_meta_serializes_camel_case() {
        let json = serde_json::to_value(PaginationMeta::new(1, 10, 25)).unwrap();
        assert_eq!(json["currentPage"], 1);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["totalItems"], 25);
        assert_eq!(json["itemsPerPage"], 10);
        assert_eq!(json["hasNextPage"], true);
        assert_eq!(json["hasPrevPage"], false);
    }

    #[test]
    fn test_none_if_empty() {
        assert_eq!(none_if_empty(None), None);
        assert_eq!(none_if_empty(Some(String::new())), None);
        assert_eq!(none_if_empty(Some("x".into())), Some("x".to_string()));
    }

    #[test]
    fn test_parse_origin_list() {
        let origins = parse_origin_list("http://localhost:3000, https://notes.example.com");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:3000");

        // Blank input falls back to the development origin.
        let origins = parse_origin_list("   ");
        assert_eq!(origins.len(), 1);
        assert_eq!(origins[0], defaults::ALLOWED_ORIGIN);
    }
}
