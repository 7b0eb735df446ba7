//! Signed session tokens (HS256 JWT).
//!
//! Tokens are minted once per login and carried by the client in a
//! cookie; nothing is stored server-side. Expiry is checked here against
//! an explicit clock rather than inside the JWT library so that expiry
//! and signature failures stay distinguishable and tests can inject time.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Internal user id (subject)
    #[serde(rename = "userId")]
    pub user_id: String,

    /// GitHub login of the user
    pub login: String,

    /// Issued-at, seconds since epoch
    pub iat: i64,

    /// Expiry, seconds since epoch (absent for non-expiring tokens)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Token issuance and verification errors
#[derive(Debug, PartialEq, Clone)]
pub enum TokenError {
    /// expires_in is not of the form `<integer><unit>` with unit in ms/s/m/h/d
    InvalidDurationFormat(String),
    /// Expiry claim is in the past
    TokenExpired,
    /// Signature does not verify, or the token is malformed
    InvalidSignature,
    /// Token could not be signed
    Signing(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::InvalidDurationFormat(value) => {
                write!(f, "Invalid expiresIn format: {}", value)
            }
            TokenError::TokenExpired => write!(f, "Token expired"),
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::Signing(msg) => write!(f, "Failed to sign token: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}

/// Parse a duration string like `7d`, `30m` or `1500ms` into milliseconds.
fn parse_duration_ms(expires_in: &str) -> Result<i64, TokenError> {
    let invalid = || TokenError::InvalidDurationFormat(expires_in.to_string());

    let unit_start = expires_in
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (digits, unit) = expires_in.split_at(unit_start);
    if digits.is_empty() {
        return Err(invalid());
    }

    let value: i64 = digits.parse().map_err(|_| invalid())?;
    let multiplier = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60 * 1_000,
        "h" => 60 * 60 * 1_000,
        "d" => 24 * 60 * 60 * 1_000,
        _ => return Err(invalid()),
    };

    Ok(value * multiplier)
}

/// Issue a signed session token, stamped with the current wall clock.
///
/// `expires_in` accepts `<integer><unit>` with unit in {ms, s, m, h, d};
/// the expiry claim is `iat + floor(duration_ms / 1000)` seconds.
pub fn issue(
    user_id: &str,
    login: &str,
    secret: &str,
    expires_in: Option<&str>,
) -> Result<String, TokenError> {
    issue_at(user_id, login, secret, expires_in, Utc::now())
}

/// Issue a signed session token with an explicit issued-at clock.
pub fn issue_at(
    user_id: &str,
    login: &str,
    secret: &str,
    expires_in: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let iat = now.timestamp();
    let exp = match expires_in {
        Some(expires_in) => Some(iat + parse_duration_ms(expires_in)? / 1_000),
        None => None,
    };

    let claims = SessionClaims {
        user_id: user_id.to_string(),
        login: login.to_string(),
        iat,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Verify a session token against the current wall clock.
pub fn verify(token: &str, secret: &str) -> Result<SessionClaims, TokenError> {
    verify_at(token, secret, Utc::now())
}

/// Verify a session token with an explicit clock.
///
/// # Errors
/// * `InvalidSignature` - Bad signature or malformed token
/// * `TokenExpired` - Expiry claim present and `now` is at or past it
pub fn verify_at(
    token: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<SessionClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked below against the caller's clock
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| TokenError::InvalidSignature)?;

    if let Some(exp) = data.claims.exp {
        if now.timestamp() >= exp {
            return Err(TokenError::TokenExpired);
        }
    }

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "test-signing-secret";

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let now = fixed_now();
        let token = issue_at("user-1", "octocat", SECRET, Some("7d"), now).unwrap();

        let claims = verify_at(&token, SECRET, now).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.login, "octocat");
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, Some(now.timestamp() + 7 * 24 * 60 * 60));
    }

    #[test]
    fn test_token_without_expiry_verifies_far_in_future() {
        let now = fixed_now();
        let token = issue_at("user-1", "octocat", SECRET, None, now).unwrap();

        let later = now + chrono::Duration::days(10_000);
        let claims = verify_at(&token, SECRET, later).unwrap();
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn test_millisecond_expiry_fails_as_expired() {
        let now = fixed_now();
        // 1ms floors to zero seconds, so exp == iat
        let token = issue_at("user-1", "octocat", SECRET, Some("1ms"), now).unwrap();

        assert_eq!(verify_at(&token, SECRET, now), Err(TokenError::TokenExpired));
        assert_eq!(
            verify_at(&token, SECRET, now + chrono::Duration::seconds(1)),
            Err(TokenError::TokenExpired)
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let now = fixed_now();
        let token = issue_at("user-1", "octocat", SECRET, Some("1h"), now).unwrap();

        // One second before expiry still valid
        let just_before = now + chrono::Duration::seconds(3_599);
        assert!(verify_at(&token, SECRET, just_before).is_ok());

        // At expiry the token is dead
        let at_expiry = now + chrono::Duration::seconds(3_600);
        assert_eq!(
            verify_at(&token, SECRET, at_expiry),
            Err(TokenError::TokenExpired)
        );
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let now = fixed_now();
        let token = issue_at("user-1", "octocat", SECRET, Some("7d"), now).unwrap();

        // Replace the last 5 characters with something different
        let split = token.len() - 5;
        let tail: String = token[split..]
            .chars()
            .map(|c| if c == 'A' { 'B' } else { 'A' })
            .collect();
        let tampered = format!("{}{}", &token[..split], tail);

        assert_eq!(
            verify_at(&tampered, SECRET, now),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = fixed_now();
        let token = issue_at("user-1", "octocat", SECRET, Some("7d"), now).unwrap();

        assert_eq!(
            verify_at(&token, "another-secret", now),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert_eq!(
            verify_at("not-a-jwt", SECRET, fixed_now()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_expired_beats_signature_only_when_signature_valid() {
        let now = fixed_now();
        let token = issue_at("user-1", "octocat", SECRET, Some("1s"), now).unwrap();

        // Expired with the right secret reports expiry
        let later = now + chrono::Duration::seconds(5);
        assert_eq!(verify_at(&token, SECRET, later), Err(TokenError::TokenExpired));

        // Expired with the wrong secret reports the signature
        assert_eq!(
            verify_at(&token, "another-secret", later),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration_ms("1ms").unwrap(), 1);
        assert_eq!(parse_duration_ms("30s").unwrap(), 30_000);
        assert_eq!(parse_duration_ms("15m").unwrap(), 900_000);
        assert_eq!(parse_duration_ms("2h").unwrap(), 7_200_000);
        assert_eq!(parse_duration_ms("7d").unwrap(), 604_800_000);
    }

    #[test]
    fn test_invalid_duration_formats_rejected() {
        for format in ["", "7", "d", "d7", "1.5h", "7 d", "7w", "-1h"] {
            let result = issue_at("user-1", "octocat", SECRET, Some(format), fixed_now());
            assert_eq!(
                result,
                Err(TokenError::InvalidDurationFormat(format.to_string())),
                "expected rejection for {:?}",
                format
            );
        }
    }
}
