//! GitHub OAuth endpoints and authorization-URL building.

/// GitHub authorization page
pub const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";

/// GitHub token exchange endpoint
pub const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

/// GitHub authenticated-user endpoint
pub const USER_API_URL: &str = "https://api.github.com/user";

/// Scopes requested during login
pub const SCOPES: &str = "read:user user:email";

/// Build the authorization URL the user is redirected to, carrying the
/// CSRF token as the `state` parameter.
pub fn build_authorize_url(client_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&scope={}&state={}&response_type=code",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(SCOPES),
        urlencoding::encode(state)
    )
}
