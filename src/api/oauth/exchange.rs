//! GitHub token exchange and identity fetch.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Token exchange response (GitHub flavored OAuth 2.0)
#[derive(Deserialize, Debug)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Authenticated GitHub identity
#[derive(Deserialize, Debug, Clone)]
pub struct GithubUser {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Exchange an authorization code for an access token.
///
/// Returns `Ok(None)` when the provider answered but did not grant a
/// token (e.g. a spent or bogus code); transport and decode failures
/// are errors.
pub async fn exchange_code(
    token_url: &str,
    code: &str,
    redirect_uri: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<Option<String>> {
    let client = reqwest::Client::new();

    let mut form_data = HashMap::new();
    form_data.insert("grant_type", "authorization_code");
    form_data.insert("code", code);
    form_data.insert("redirect_uri", redirect_uri);
    form_data.insert("client_id", client_id);
    form_data.insert("client_secret", client_secret);

    tracing::debug!("Exchanging authorization code for token at {}", token_url);

    let response = client
        .post(token_url)
        .header("Accept", "application/json")
        .form(&form_data)
        .send()
        .await
        .context("Failed to send token exchange request")?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Token exchange failed with status {}",
            response.status()
        ));
    }

    let token: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    if let Some(error) = &token.error {
        tracing::warn!(
            error = %error,
            description = token.error_description.as_deref().unwrap_or("none"),
            "Provider declined the token exchange"
        );
    }

    Ok(token.access_token)
}

/// Fetch the identity the access token belongs to.
pub async fn fetch_user(user_api_url: &str, access_token: &str) -> Result<GithubUser> {
    let client = reqwest::Client::new();

    let response = client
        .get(user_api_url)
        .header("Accept", "application/vnd.github+json")
        .header("Authorization", format!("Bearer {}", access_token))
        .header("User-Agent", "notehub")
        .send()
        .await
        .context("Failed to send user request")?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "User fetch failed with status {}",
            response.status()
        ));
    }

    response
        .json()
        .await
        .context("Failed to parse user response")
}
