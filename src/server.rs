//! HTTP layer — axum router, API-key gate, and the embedded form.
//!
//! The core exposes one real entry point (the submission pipeline); this
//! module is the thin wrapper around it: routing, body limits, the
//! privileged-channel key check, status-code mapping, per-request logging,
//! and serving the static form page.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use rust_embed::RustEmbed;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::errors::SubmitError;
use crate::provision;
use crate::submit::{AttachmentResult, Channel, SubmissionPipeline, SubmissionRequest};
use crate::trello::{BoardService, TrelloClient};

/// Static form assets, compiled into the binary.
#[derive(RustEmbed)]
#[folder = "public/"]
struct Assets;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: SubmissionPipeline,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Arc<AppConfig>, service: Arc<dyn BoardService>) -> Self {
        Self {
            pipeline: SubmissionPipeline::new(config.clone(), service),
            config,
        }
    }
}

// ── Response payload types ────────────────────────────────────────────

#[derive(Serialize)]
struct SubmitAck {
    message: &'static str,
    card_id: String,
    labels_applied: usize,
    attachments: Vec<AttachmentResult>,
}

#[derive(Serialize)]
struct EventList<'a> {
    events: Vec<&'a str>,
    default_event: &'a str,
}

// ── Error handling ────────────────────────────────────────────────────

/// HTTP mapping of pipeline failures. Callers see field errors, a
/// configuration mismatch, or a reduced upstream status — never Trello
/// internals.
enum ApiError {
    Validation(Vec<crate::errors::FieldError>),
    BoardResolution(String),
    Upstream(String),
    Forbidden,
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Validation(fields) => ApiError::Validation(fields),
            SubmitError::UnknownEvent { .. } | SubmitError::NoIncomingList { .. } => {
                tracing::warn!(error = %err, "board resolution failed");
                ApiError::BoardResolution(err.to_string())
            }
            SubmitError::CardCreate { .. } | SubmitError::Trello(_) => {
                tracing::error!(error = %err, "upstream failure");
                ApiError::Upstream(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"errors": fields})),
            )
                .into_response(),
            ApiError::BoardResolution(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({"error": msg})),
            )
                .into_response(),
            ApiError::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": msg})),
            )
                .into_response(),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"error": "Invalid or missing API key"})),
            )
                .into_response(),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.config.max_body_bytes();
    Router::new()
        .route("/submit", post(submit_public))
        .route("/api/submit", post(submit_privileged))
        .route("/events", get(list_events))
        .route("/version", get(version))
        .route("/health", get(health_check))
        .fallback(static_handler)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(req: Request, next: Next) -> Response {
    tracing::info!("{} {}", req.method(), req.uri().path());
    next.run(req).await
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn submit_public(
    State(state): State<SharedState>,
    Json(request): Json<SubmissionRequest>,
) -> Result<Json<SubmitAck>, ApiError> {
    run_pipeline(&state, Channel::Public, request).await
}

async fn submit_privileged(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<SubmissionRequest>,
) -> Result<Json<SubmitAck>, ApiError> {
    // No configured key means the privileged path is switched off entirely.
    let expected = state.config.server.api_key.as_deref().ok_or(ApiError::Forbidden)?;
    let supplied = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Forbidden)?;
    if supplied != expected {
        return Err(ApiError::Forbidden);
    }
    run_pipeline(&state, Channel::PrivilegedApi, request).await
}

async fn run_pipeline(
    state: &SharedState,
    channel: Channel,
    request: SubmissionRequest,
) -> Result<Json<SubmitAck>, ApiError> {
    let result = state.pipeline.submit(channel, request).await?;
    Ok(Json(SubmitAck {
        message: "Request submitted",
        card_id: result.card_id,
        labels_applied: result.label_ids_applied.len(),
        attachments: result.attachment_results,
    }))
}

/// Enabled events plus the default, for the form's dropdown.
async fn list_events(State(state): State<SharedState>) -> Response {
    Json(EventList {
        events: state.config.enabled_events(),
        default_event: &state.config.server.default_event,
    })
    .into_response()
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({"version": env!("CARGO_PKG_VERSION")}))
}

async fn health_check() -> &'static str {
    "ok"
}

/// Serve embedded static files; the bare path gets index.html.
async fn static_handler(req: Request<Body>) -> impl IntoResponse {
    let path = req.uri().path().trim_start_matches('/');

    if !path.is_empty() {
        if let Some(content) = Assets::get(path) {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            return Response::builder()
                .header(header::CONTENT_TYPE, mime.as_ref())
                .body(Body::from(content.data.to_vec()))
                .unwrap()
                .into_response();
        }
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    }

    match Assets::get("index.html") {
        Some(content) => Html(String::from_utf8_lossy(&content.data).to_string()).into_response(),
        None => (StatusCode::NOT_FOUND, "Form page missing from build").into_response(),
    }
}

// ── Startup ───────────────────────────────────────────────────────────

/// Provision labels, then serve until ctrl-c/SIGTERM.
pub async fn start_server(config: AppConfig) -> Result<()> {
    let config = Arc::new(config);
    let client = TrelloClient::new(config.trello.clone())
        .context("Failed to build Trello client")?;
    let service: Arc<dyn BoardService> = Arc::new(client);

    let summary = provision::verify_labels(&config, service.as_ref()).await;
    tracing::info!(
        boards = summary.boards_checked,
        created = summary.labels_created,
        failures = summary.failures,
        "label provisioning complete"
    );

    let state = Arc::new(AppState::new(config.clone(), service));
    let mut app = build_router(state);
    if config.server.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if config.server.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let local_addr = listener.local_addr()?;
    tracing::info!("pitboard running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
