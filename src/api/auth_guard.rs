//! Session-token authentication middleware.
//!
//! Two variants: `require_auth` rejects unauthenticated requests with
//! 401 before the handler runs; `optional_auth` attaches identity when a
//! valid token is present and proceeds anonymously otherwise. Both read
//! the token cookie and verify it against the configured signing secret.

use crate::api::{AppState, ErrorResponse};
use crate::token::{self, SessionClaims};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use tracing::debug;


/// Name of the session-token cookie
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated identity attached to the request by the guard
#[derive(Clone, Debug)]
pub struct AuthUser(pub SessionClaims);

/// Reject the request unless it carries a valid session token.
///
/// Expired and tampered tokens get the same generic message; the
/// distinction is only logged server-side.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(cookie) = jar.get(TOKEN_COOKIE) else {
        return unauthorized("Unauthorized");
    };

    match token::verify(cookie.value(), &state.config.jwt_secret) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthUser(claims));
            next.run(request).await
        }
        Err(err) => {
            debug!(error = %err, "Session token rejected");
            unauthorized("Invalid token")
        }
    }
}

/// Attach identity when a valid token is present; never reject.
pub async fn optional_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        if let Ok(claims) = token::verify(cookie.value(), &state.config.jwt_secret) {
            request.extensions_mut().insert(AuthUser(claims));
        }
    }

    next.run(request).await
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
