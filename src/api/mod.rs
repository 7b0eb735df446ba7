//! HTTP API: shared state, error mapping and the application router.

pub mod auth_guard;
pub mod notes;
pub mod oauth;
pub mod webhooks;

use crate::config::Config;
use crate::session::SessionStore;
use crate::storage::Database;
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Shared application state threaded into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Arc<Config>,
}

/// Error response body shared by every endpoint
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Application error types mapped onto HTTP statuses
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    ServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

/// Map an unexpected storage failure to a generic 500, logging the
/// detail server-side only.
pub(crate) fn internal_error(err: anyhow::Error) -> AppError {
    tracing::error!(error = %err, "Internal error");
    AppError::ServerError("Internal server error".to_string())
}

/// Build the complete application router.
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health))
        .merge(oauth::create_auth_router(state.clone()))
        .merge(notes::create_notes_router(state.clone()))
        .merge(webhooks::create_webhook_router(state))
        .layer(cors)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// CORS restricted to the configured origins, with credentials so the
/// session cookie flows on cross-origin requests.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(86_400))
}
