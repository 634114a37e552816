//! HTTP Server for the import API.
//!
//! # API Endpoints
//!
//! | Method | Path                   | Description                              |
//! |--------|------------------------|------------------------------------------|
//! | GET    | `/health`              | Health check                             |
//! | POST   | `/api/import`          | Import a page from its JSON envelope     |
//! | GET    | `/api/pages/{page_id}` | Fetch a page from the wiki and import it |
//! | GET    | `/api/search?q=`       | Search the wiki for pages                |
//! | GET    | `/api/logs`            | SSE stream for real-time logs            |

use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{
    error_response, import_error_response, ImportParams, ImportResponse, SearchParams,
    SearchResponse,
};
use crate::cache::{CachingResolver, UrlCache};
use crate::config::{ImportOptions, Settings};
use crate::error::{ImportError, ServerError, ServerResult};
use crate::resolve::MediaWikiClient;
use crate::transform::pipeline::import_json;

type ApiError = (StatusCode, Json<Value>);

/// Shared state of the server.
pub struct AppState {
    client: MediaWikiClient,
    resolver: CachingResolver<MediaWikiClient>,
    options: ImportOptions,
}

impl AppState {
    pub fn new(settings: &Settings, options: ImportOptions) -> ServerResult<Self> {
        let client =
            MediaWikiClient::new(settings).map_err(|e| ServerError::Internal(e.to_string()))?;
        let cache = UrlCache::with_dir(&settings.cache_dir);
        Ok(Self {
            resolver: CachingResolver::new(client.clone(), cache)
                .with_namespace(options.namespace.clone()),
            client,
            options,
        })
    }
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/import", post(import_envelope))
        .route("/api/pages/{page_id}", get(import_page_by_id))
        .route("/api/search", get(search))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(port: u16, settings: Settings, options: ImportOptions) -> ServerResult<()> {
    let state = Arc::new(AppState::new(&settings, options)?);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    eprintln!("🚀 cpdl-ingest server running on http://localhost:{}", port);
    eprintln!("   POST /api/import          - Import a page envelope");
    eprintln!("   GET  /api/pages/{{id}}     - Fetch and import a page");
    eprintln!("   GET  /api/search?q=...    - Search pages");
    eprintln!("   GET  /api/logs            - SSE log stream");
    eprintln!("   GET  /health              - Health check");
    eprintln!("   Wiki: {}", settings.api_url);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "cpdl-ingest",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "import": "POST /api/import",
            "page": "GET /api/pages/{page_id}",
            "search": "GET /api/search?q=",
            "logs": "GET /api/logs (SSE)"
        }
    }))
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

/// Import a page envelope posted as the request body
async fn import_envelope(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImportParams>,
    body: String,
) -> Result<Json<ImportResponse>, ApiError> {
    if body.trim().is_empty() {
        return Err(reject(ServerError::BadRequest("empty request body".to_string())));
    }
    log_info(format!("📄 New import ({} bytes)", body.len()));
    run_import(&state, &body, params).await
}

/// Fetch a page from the wiki, then import it
async fn import_page_by_id(
    State(state): State<Arc<AppState>>,
    Path(page_id): Path<u64>,
    Query(params): Query<ImportParams>,
) -> Result<Json<ImportResponse>, ApiError> {
    let envelope = state
        .client
        .fetch_page(page_id)
        .await
        .map_err(|e| reject(ImportError::Resolve(e).into()))?;
    run_import(&state, &envelope, params).await
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let terms = params.q.trim();
    if terms.is_empty() {
        return Err(reject(ServerError::BadRequest("missing search terms".to_string())));
    }
    let results = state
        .client
        .search(terms)
        .await
        .map_err(|e| reject(ImportError::Resolve(e).into()))?;
    Ok(Json(SearchResponse {
        query: terms.to_string(),
        results,
    }))
}

async fn run_import(
    state: &AppState,
    envelope: &str,
    params: ImportParams,
) -> Result<Json<ImportResponse>, ApiError> {
    let options = params.apply(state.options.clone());
    let result = import_json(envelope, &state.resolver, &options)
        .await
        .map_err(|e| reject(e.into()))?;
    Ok(Json(ImportResponse::from(result)))
}

/// Map an error to a status code and JSON body
fn reject(error: ServerError) -> ApiError {
    log_error(error.to_string());
    match error {
        ServerError::Import(e) => {
            let status = match e {
                ImportError::Resolve(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, Json(import_error_response(&e)))
        }
        ServerError::BadRequest(msg) => (
            StatusCode::BAD_REQUEST,
            Json(error_response(&msg, "invalid request")),
        ),
        ServerError::Internal(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(error_response(&msg, "internal error")),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;

    #[test]
    fn test_reject_status_codes() {
        let (status, body) = reject(ImportError::Resolve(ResolveError::Timeout).into());
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.0["message"], "could not reach the catalogue, try again later");

        let (status, _) = reject(ImportError::DataInconsistency("x".into()).into());
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = reject(ServerError::BadRequest("empty".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_offline_import_handler() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            cache_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let state = Arc::new(AppState::new(&settings, ImportOptions::default()).unwrap());
        let body = r#"{"parse": {"title": "Ecco", "text": {"*": "<ul><li><font>CPDL #1:</font></li></ul>"},
                       "images": ["Pdf.gif", "Midi.gif", "A.pdf"]}}"#;
        let params = ImportParams {
            offline: Some(true),
            ..Default::default()
        };

        let Json(response) = import_envelope(State(state), Query(params), body.to_string())
            .await
            .unwrap();

        assert_eq!(response.metadata.edition_count, 1);
        assert_eq!(response.metadata.resolution_gaps, 1);
    }
}
