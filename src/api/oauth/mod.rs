//! GitHub OAuth login flow.
//!
//! Three-leg handshake:
//! 1. GET /auth/github → set handshake cookie, redirect to GitHub
//! 2. User authorizes on GitHub
//! 3. GET /auth/callback → verify CSRF state, exchange code, upsert
//!    user, set session-token cookie, redirect to the frontend
//!
//! Plus POST /auth/logout and GET /auth/me.
//!
//! The handshake state lives in the session store keyed by a random
//! session id so both legs run as independent stateless requests. The
//! CSRF check happens before the token exchange; a forged callback
//! never reaches GitHub.

mod exchange;
mod provider;

use crate::api::auth_guard::{self, AuthUser};
use crate::api::{AppError, AppState};
use crate::crypto;
use crate::session::{SessionRecord, SessionStore};
use crate::token;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Name of the handshake session cookie
const SESSION_COOKIE: &str = "session_id";

/// Handshake session lifetime (10 minutes)
const SESSION_TTL_SECONDS: i64 = 600;

/// Session token lifetime
const TOKEN_EXPIRES_IN: &str = "7d";
const TOKEN_MAX_AGE_SECONDS: i64 = 7 * 24 * 60 * 60;

/// OAuth callback query parameters
#[derive(Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

#[derive(Serialize)]
struct LogoutResponse {
    success: bool,
}

/// Current-identity response (never exposes the stored token)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    id: String,
    login: String,
    avatar_url: Option<String>,
}

/// Create the auth API router
pub fn create_auth_router(state: AppState) -> Router {
    let protected = Router::new().route(
        "/auth/me",
        get(me).route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_guard::require_auth,
        )),
    );

    Router::new()
        .route("/auth/github", get(oauth_start))
        .route("/auth/callback", get(oauth_callback))
        .route("/auth/logout", post(logout))
        .merge(protected)
        .with_state(state)
}

/// 302 Found with a Location header
fn found(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(SESSION_TTL_SECONDS))
        .build()
}

fn token_cookie(token: String) -> Cookie<'static> {
    Cookie::build((auth_guard::TOKEN_COOKIE, token))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(TOKEN_MAX_AGE_SECONDS))
        .build()
}

/// GET /auth/github
///
/// Starts the handshake: persists a session record binding a fresh CSRF
/// token, sets the session cookie, and redirects to GitHub.
async fn oauth_start(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Response) {
    let session_id = Uuid::new_v4().to_string();
    let csrf_token = Uuid::new_v4().to_string();

    let now = Utc::now();
    state.sessions.put(
        &session_id,
        SessionRecord {
            csrf_token: csrf_token.clone(),
            created_at: now,
            expires_at: now + Duration::seconds(SESSION_TTL_SECONDS),
        },
        SESSION_TTL_SECONDS,
    );

    let redirect_uri = format!("{}/auth/callback", state.config.public_url);
    let url = provider::build_authorize_url(
        &state.config.github_client_id,
        &redirect_uri,
        &csrf_token,
    );

    debug!("Redirecting to GitHub authorization page");

    (jar.add(session_cookie(session_id)), found(&url))
}

/// GET /auth/callback
///
/// Completes the handshake. CSRF verification must succeed before any
/// call leaves for GitHub.
async fn oauth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<(CookieJar, Response), AppError> {
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let (Some(code), Some(callback_state), Some(session_id)) =
        (query.code, query.state, session_id)
    else {
        return Err(AppError::BadRequest(
            "Invalid callback parameters".to_string(),
        ));
    };

    let Some(record) = state.sessions.get(&session_id) else {
        warn!("OAuth callback with unknown or expired session");
        return Err(AppError::BadRequest("Session not found".to_string()));
    };

    if record.csrf_token != callback_state {
        warn!("OAuth callback state does not match stored CSRF token");
        return Err(AppError::BadRequest("CSRF token mismatch".to_string()));
    }

    let redirect_uri = format!("{}/auth/callback", state.config.public_url);
    let access_token = exchange::exchange_code(
        provider::TOKEN_URL,
        &code,
        &redirect_uri,
        &state.config.github_client_id,
        &state.config.github_client_secret,
    )
    .await
    .map_err(|err| {
        error!(error = %err, "GitHub token exchange failed");
        AppError::ServerError("Authentication failed".to_string())
    })?
    .ok_or_else(|| AppError::ServerError("Failed to get access token".to_string()))?;

    let github_user = exchange::fetch_user(provider::USER_API_URL, &access_token)
        .await
        .map_err(|err| {
            error!(error = %err, "GitHub identity fetch failed");
            AppError::ServerError("Authentication failed".to_string())
        })?;

    let encrypted_token =
        crypto::encrypt(&access_token, &state.config.encryption_key).map_err(|err| {
            error!(error = %err, "Failed to encrypt access token");
            AppError::ServerError("Authentication failed".to_string())
        })?;

    let user = state
        .db
        .upsert_user(
            github_user.id,
            &github_user.login,
            github_user.avatar_url.as_deref(),
            &encrypted_token,
        )
        .map_err(|err| {
            error!(error = %err, "Failed to persist user");
            AppError::ServerError("Authentication failed".to_string())
        })?;

    let session_token = token::issue(
        &user.id,
        &user.login,
        &state.config.jwt_secret,
        Some(TOKEN_EXPIRES_IN),
    )
    .map_err(|err| {
        error!(error = %err, "Failed to mint session token");
        AppError::ServerError("Authentication failed".to_string())
    })?;

    // The handshake session is single-use
    state.sessions.delete(&session_id);

    info!(user = %user.login, "User logged in");

    Ok((
        jar.add(token_cookie(session_token)),
        found(&format!("{}/dashboard", state.config.frontend_url)),
    ))
}

/// POST /auth/logout
///
/// Clears the session-token cookie. Always succeeds.
async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let cleared = Cookie::build((auth_guard::TOKEN_COOKIE, ""))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();

    (jar.add(cleared), Json(LogoutResponse { success: true }))
}

/// GET /auth/me
///
/// A valid token whose user row has vanished is a real inconsistency
/// and surfaces as 404 rather than being swallowed.
async fn me(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Result<Json<MeResponse>, AppError> {
    let user = state
        .db
        .user_by_id(&claims.user_id)
        .map_err(crate::api::internal_error)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(MeResponse {
        id: user.id,
        login: user.login,
        avatar_url: user.avatar_url,
    }))
}
