//! Environment-driven configuration.
//!
//! All secrets come from the environment, never from files on disk.
//! Required variables fail startup with a message naming the variable.

use anyhow::{bail, Context, Result};

/// Minimum length of the symmetric encryption key (only the first 32
/// bytes are used as key material)
const MIN_ENCRYPTION_KEY_LEN: usize = 32;

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// GitHub OAuth application client id
    pub github_client_id: String,

    /// GitHub OAuth application client secret
    pub github_client_secret: String,

    /// HS256 secret used to sign session tokens
    pub jwt_secret: String,

    /// Key for encrypting GitHub access tokens at rest
    pub encryption_key: String,

    /// Shared secret for webhook signature verification
    pub webhook_secret: String,

    /// Frontend base URL users are redirected to after login
    pub frontend_url: String,

    /// Public base URL of this server (used to build the OAuth redirect_uri)
    pub public_url: String,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Path to the SQLite database file
    pub db_path: String,

    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails when a required variable is missing or the encryption key
    /// is too short.
    pub fn from_env() -> Result<Self> {
        let github_client_id = require("GITHUB_CLIENT_ID")?;
        let github_client_secret = require("GITHUB_CLIENT_SECRET")?;
        let jwt_secret = require("JWT_SECRET")?;
        let encryption_key = require("ENCRYPTION_KEY")?;
        let webhook_secret = require("GITHUB_WEBHOOK_SECRET")?;
        let frontend_url = require("FRONTEND_URL")?;

        let public_url = std::env::var("NOTEHUB_PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let bind_addr =
            std::env::var("NOTEHUB_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let db_path =
            std::env::var("NOTEHUB_DB_PATH").unwrap_or_else(|_| "notehub.db".to_string());

        let allowed_origins = match std::env::var("NOTEHUB_ALLOWED_ORIGINS") {
            Ok(list) => list
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            Err(_) => default_origins(&frontend_url),
        };

        let config = Self {
            github_client_id,
            github_client_secret,
            jwt_secret,
            encryption_key,
            webhook_secret,
            frontend_url,
            public_url,
            bind_addr,
            db_path,
            allowed_origins,
        };
        config.validate()?;

        Ok(config)
    }

    /// Validate invariants that would otherwise only fail at request time.
    pub fn validate(&self) -> Result<()> {
        if self.encryption_key.len() < MIN_ENCRYPTION_KEY_LEN {
            bail!(
                "ENCRYPTION_KEY must be at least {} characters, got {}",
                MIN_ENCRYPTION_KEY_LEN,
                self.encryption_key.len()
            );
        }
        Ok(())
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("Missing required environment variable {}", name))
}

/// CORS origins allowed when NOTEHUB_ALLOWED_ORIGINS is not set:
/// the deployed frontend plus common local dev servers.
fn default_origins(frontend_url: &str) -> Vec<String> {
    vec![
        frontend_url.to_string(),
        "http://localhost:5173".to_string(),
        "http://localhost:5174".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            github_client_id: "client-id".to_string(),
            github_client_secret: "client-secret".to_string(),
            jwt_secret: "jwt-secret".to_string(),
            encryption_key: "0123456789abcdef0123456789abcdef".to_string(),
            webhook_secret: "webhook-secret".to_string(),
            frontend_url: "https://app.example.com".to_string(),
            public_url: "http://localhost:8080".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            db_path: ":memory:".to_string(),
            allowed_origins: default_origins("https://app.example.com"),
        }
    }

    #[test]
    fn test_valid_config_passes_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_short_encryption_key_rejected() {
        let mut config = test_config();
        config.encryption_key = "too-short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exactly_32_char_key_accepted() {
        let mut config = test_config();
        config.encryption_key = "a".repeat(32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_origins_include_frontend() {
        let origins = default_origins("https://app.example.com");
        assert!(origins.contains(&"https://app.example.com".to_string()));
        assert!(origins.contains(&"http://localhost:5173".to_string()));
    }
}
