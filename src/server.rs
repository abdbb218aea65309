use axum::{
    Json, Router,
    extract::{Query, Request, State, rejection::JsonRejection},
    http::{StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use tracing::{debug, error, info};

use crate::AppState;
use crate::assistant::Assistant;
use crate::chat::{ChatResponse, Message, Meta, TablePayload};
use crate::config::AppConfig;
use crate::ui::widget_page;
use crate::wages::{STATE_PROMPT, WageDirectory, detect_state, is_wage_query};

/// How often idle conversations are swept.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

const MISSING_CHAT_FIELDS: &str = "Missing 'message' or 'session_id'";
const MISSING_STATE: &str = "Missing 'state' parameter";

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let state = AppState::new(Arc::clone(&config))?;

    info!(
        name: "wages.config.loaded",
        api_url = ?state.wages.api_url().map(url::Url::as_str),
        "Wage directory configured"
    );

    spawn_cleanup(&state);

    let app = router(state);

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Periodically drop conversations idle past the configured timeout.
fn spawn_cleanup(state: &AppState) {
    let conversations = state.conversations.clone();
    let timeout = state.config.server.session_timeout();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = conversations.cleanup_expired_with_timeout(timeout);
            if removed > 0 {
                debug!(name: "session.cleanup", removed, "Expired conversations removed");
            }
        }
    });
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let timeout_duration = state.config.server.request_timeout();

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/min-wage", get(min_wage))
        .route("/export", post(export_pdf))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error returned by handlers as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - The chat widget.
async fn index(State(state): State<AppState>) -> Html<String> {
    Html(widget_page(&state.renderer))
}

/// GET /health - Liveness check.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Body of `POST /chat`; both fields are checked by the handler.
#[derive(Debug, Deserialize)]
struct ChatInput {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

/// Answer one message: wage questions go to the directory, everything else
/// to the assistant along with the session's earlier turns.
pub async fn answer(
    wages: &WageDirectory,
    assistant: &Assistant,
    history: &[Message],
    message: &str,
) -> ChatResponse {
    if is_wage_query(message) {
        return match detect_state(message) {
            Some(state) => wages.lookup(state).await,
            None => ChatResponse::text(STATE_PROMPT),
        };
    }

    ChatResponse::text(assistant.answer(history, message).await)
}

/// POST /chat - Answer a widget message.
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatInput>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(input) = payload.map_err(|e| {
        debug!(name: "chat.request.rejected", error = %e, "Unreadable chat request");
        ApiError::BadRequest(MISSING_CHAT_FIELDS.into())
    })?;

    let message = input
        .message
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty());
    let session_id = input.session_id.filter(|id| !id.trim().is_empty());
    let (Some(message), Some(session_id)) = (message, session_id) else {
        return Err(ApiError::BadRequest(MISSING_CHAT_FIELDS.into()));
    };

    info!(
        name: "chat.request.received",
        session_id = %session_id,
        "Received chat request"
    );

    let conversation = state.conversations.get_or_create(&session_id);
    let history = conversation.messages();
    conversation.add_user_message(message.as_str());

    let response = answer(&state.wages, &state.assistant, &history, &message).await;

    if let Some(reply) = &response.reply {
        conversation.add_bot_message(reply.as_str());
    }

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct MinWageQuery {
    state: Option<String>,
}

/// GET /min-wage?state= - Direct wage lookup.
async fn min_wage(
    State(state): State<AppState>,
    Query(query): Query<MinWageQuery>,
) -> Result<Json<ChatResponse>, ApiError> {
    let name = query
        .state
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(MISSING_STATE.into()))?;
    Ok(Json(state.wages.lookup(&name).await))
}

#[derive(Debug, Deserialize)]
struct ExportInput {
    table: Vec<Vec<String>>,
    #[serde(default)]
    meta: Option<Meta>,
}

/// POST /export - Render a table reply as a PDF download.
async fn export_pdf(
    State(state): State<AppState>,
    Json(input): Json<ExportInput>,
) -> Result<Response, ApiError> {
    let table =
        TablePayload::from_grid(input.table).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let pdf = state
        .exporter
        .render(&table, input.meta.as_ref())
        .map_err(|e| {
            error!(name: "export.pdf.failed", error = %e, "PDF generation failed");
            ApiError::Internal("Failed to generate PDF".into())
        })?;

    let disposition = format!("attachment; filename=\"{}\"", pdf.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf.bytes,
    )
        .into_response())
}
