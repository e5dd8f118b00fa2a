//! HTTP transport.
//!
//! A thin JSON layer over [`SearchEngine`]. Handlers only translate between
//! HTTP and the engine; every search decision lives in [`crate::search`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/search/{kind}` | Run a search (`username`, `email`, `phone`, `image`) |
//! | `GET`  | `/providers` | Registered providers and credential status |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Search bodies are `{"query": "..."}`, or for images
//! `{"image": "<base64 or data URI>", "filename": "..."}`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Invalid email format" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//! Provider failures are never HTTP errors; they show up as `found: null`
//! entries inside a 200 report.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front-ends
//! can call the API directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::SearchError;
use crate::models::{RawQuery, SearchKind, SearchRequest};
use crate::search::{SearchEngine, SearchReport};
use crate::sources::{get_providers, ProviderStatus};

#[derive(Clone)]
struct AppState {
    engine: Arc<SearchEngine>,
}

/// Starts the HTTP server on `[server].bind` and serves until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = Arc::new(SearchEngine::from_config(config)?);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "server started");
    println!("trace listening on http://{}", config.server.bind);
    axum::serve(listener, router(engine)).await?;
    Ok(())
}

/// Build the application router around a shared engine.
pub fn router(engine: Arc<SearchEngine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search/{kind}", post(handle_search))
        .route("/providers", get(handle_providers))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { engine })
}

// ═══════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Validation(e) => bad_request(e.to_string()),
            SearchError::Internal(e) => {
                warn!(error = %e, "search failed");
                internal(e.to_string())
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// POST /search/{kind}
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
struct SearchBody {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

async fn handle_search(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchReport>, AppError> {
    let kind: SearchKind = kind.parse().map_err(not_found)?;

    let text = match kind {
        SearchKind::Image => body.image.or(body.query),
        _ => body.query,
    };
    let request = SearchRequest {
        kind,
        query: RawQuery::Text(text.unwrap_or_default()),
        filename: body.filename,
    };

    let report = state.engine.aggregate(&request).await?;
    Ok(Json(report))
}

// ═══════════════════════════════════════════════════════════════════════
// GET /providers, GET /health
// ═══════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct ProvidersResponse {
    providers: Vec<ProviderStatus>,
}

async fn handle_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: get_providers(state.engine.registries()),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
