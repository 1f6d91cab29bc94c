//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Status, version, and whether the database answers |
//! | `POST` | `/records` | Store a new record |
//! | `GET`  | `/records/{id}` | Fetch one record |
//! | `GET`  | `/search?q=&limit=` | Direct retrieval, `limit` in `1..=20` |
//! | `POST` | `/ask` | Grounded answer for `{"question": "..."}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `backend_unavailable` (503), `internal` (500).
//!
//! Every response carries an `x-request-id` header; the same id appears in
//! the request log line.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, Request, State,
    },
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use household_memory_core::pipeline::MAX_SEARCH_LIMIT;
use household_memory_core::store::fetch_record;
use household_memory_core::{Answer, Hit, RecallError, RecallPipeline, Record, SourceKind};

use crate::ask::build_pipeline;
use crate::config::Config;
use crate::records::{add_record, open_store, NewRecord};
use crate::sqlite_store::SqliteStore;

#[derive(Clone)]
struct AppState {
    store: Arc<SqliteStore>,
    pipeline: Arc<RecallPipeline<SqliteStore>>,
    default_limit: usize,
}

/// Start the server on `[server].bind` and run until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(open_store(config).await?);
    let pipeline = Arc::new(build_pipeline(config, store.clone())?);

    let state = AppState {
        store,
        pipeline,
        default_limit: config.retrieval.limit,
    };

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "household memory server listening");
    println!("Household Memory server listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/records", post(handle_add_record))
        .route("/records/{id}", get(handle_get_record))
        .route("/search", get(handle_search))
        .route("/ask", post(handle_ask))
        .layer(middleware::from_fn(log_requests))
        .layer(cors)
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(request).await;

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

// ============ Error response ============

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
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{err:#}"), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: err.to_string(),
    }
}

impl From<RecallError> for AppError {
    fn from(err: RecallError) -> Self {
        match err {
            RecallError::SearchBackend(_) | RecallError::Store(_) => {
                tracing::warn!(error = %err, "search backend unavailable");
                AppError {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    code: "backend_unavailable",
                    message: err.to_string(),
                }
            }
            RecallError::Config(_) => internal(err.into()),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    db_accessible: bool,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db_accessible: state.store.ping().await,
    })
}

// ============ POST /records ============

#[derive(Deserialize)]
struct AddRecordRequest {
    title: String,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    source_kind: Option<String>,
    #[serde(default)]
    source_ref: Option<String>,
}

async fn handle_add_record(
    State(state): State<AppState>,
    payload: Result<Json<AddRecordRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;

    let source_kind = match req.source_kind.as_deref() {
        Some(kind) => kind.parse::<SourceKind>().map_err(bad_request)?,
        None => SourceKind::default(),
    };
    let new = NewRecord {
        title: req.title,
        content: req.content,
        tags: req.tags,
        source_kind,
        source_ref: req.source_ref,
    };

    let record = new.into_record().map_err(|e| bad_request(e.to_string()))?;
    add_record(&state.store, &record).await.map_err(internal)?;

    Ok((StatusCode::CREATED, Json(record)))
}

// ============ GET /records/{id} ============

async fn handle_get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, AppError> {
    fetch_record(state.store.as_ref(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("record not found: {}", id)))
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    hits: Vec<Hit>,
}

async fn handle_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;

    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(bad_request("q must not be empty"));
    }
    let limit = params.limit.unwrap_or(state.default_limit);
    if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
        return Err(bad_request(format!(
            "limit must be between 1 and {}",
            MAX_SEARCH_LIMIT
        )));
    }

    let hits = state.pipeline.search(&query, limit).await?;
    Ok(Json(SearchResponse { query, hits }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<Answer>, AppError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let answer = state.pipeline.answer(&req.question).await?;
    Ok(Json(answer))
}
