//! AES-256-GCM encryption for GitHub access tokens.
//!
//! Each call uses a fresh random nonce. The nonce is prepended to the
//! ciphertext and the whole buffer is base64-encoded, so an encrypted
//! credential is a single opaque string column in the database.
//!
//! The key is an arbitrary string of at least 32 bytes; only the first
//! 32 bytes are used as key material.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Size of the encryption key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
const NONCE_SIZE: usize = 12;

/// Encryption and decryption errors
#[derive(Debug, PartialEq, Clone)]
pub enum CryptoError {
    /// Key shorter than 32 bytes
    InvalidKeyLength { got: usize },
    /// Cipher construction or encryption failed
    EncryptionFailure,
    /// Authentication failed or the token is malformed
    DecryptionFailure,
}

impl std::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CryptoError::InvalidKeyLength { got } => write!(
                f,
                "Encryption key must be at least {} bytes, got {}",
                KEY_SIZE, got
            ),
            CryptoError::EncryptionFailure => write!(f, "Encryption failed"),
            CryptoError::DecryptionFailure => {
                write!(f, "Decryption failed (wrong key or corrupted data)")
            }
        }
    }
}

impl std::error::Error for CryptoError {}

/// The first 32 bytes of the key string, rejecting shorter keys.
fn key_material(key: &str) -> Result<&[u8], CryptoError> {
    let bytes = key.as_bytes();
    if bytes.len() < KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength { got: bytes.len() });
    }
    Ok(&bytes[..KEY_SIZE])
}

/// Encrypts plaintext using AES-256-GCM with a random nonce.
///
/// # Arguments
/// * `plaintext` - Data to encrypt (e.g., access token)
/// * `key` - Key string, at least 32 bytes
///
/// # Returns
/// * `Ok(String)` - base64(nonce || ciphertext), a single opaque token
/// * `Err` - If the key is too short or encryption fails
///
/// # Security
/// - Uses a cryptographically secure random nonce (never reuse)
/// - Authenticated encryption (tampering detected on decrypt)
pub fn encrypt(plaintext: &str, key: &str) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key_material(key)?)
        .map_err(|_| CryptoError::EncryptionFailure)?;

    // Generate random nonce (never reuse!)
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailure)?;

    let mut buffer = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    buffer.extend_from_slice(&nonce);
    buffer.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(&buffer))
}

/// Decrypts a token produced by [`encrypt`].
///
/// # Arguments
/// * `token` - base64(nonce || ciphertext) as returned by `encrypt`
/// * `key` - Key string, at least 32 bytes (must match the encrypting key)
///
/// # Returns
/// * `Ok(String)` - Decrypted plaintext
/// * `Err(DecryptionFailure)` - Wrong key, tampered or malformed token;
///   never a silently wrong plaintext
pub fn decrypt(token: &str, key: &str) -> Result<String, CryptoError> {
    let material = key_material(key)?;

    let bytes = BASE64
        .decode(token)
        .map_err(|_| CryptoError::DecryptionFailure)?;
    if bytes.len() < NONCE_SIZE {
        return Err(CryptoError::DecryptionFailure);
    }
    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);

    let cipher =
        Aes256Gcm::new_from_slice(material).map_err(|_| CryptoError::EncryptionFailure)?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailure)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = "gho_secret-access-token-12345";

        let token = encrypt(plaintext, KEY).expect("Encryption failed");
        assert_ne!(token, plaintext);

        let decrypted = decrypt(&token, KEY).expect("Decryption failed");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_roundtrip_empty_string() {
        let token = encrypt("", KEY).unwrap();
        assert_eq!(decrypt(&token, KEY).unwrap(), "");
    }

    #[test]
    fn test_roundtrip_large_payload() {
        let plaintext = "x".repeat(100_000);
        let token = encrypt(&plaintext, KEY).unwrap();
        assert_eq!(decrypt(&token, KEY).unwrap(), plaintext);
    }

    #[test]
    fn test_roundtrip_unicode() {
        let plaintext = "トークン 🔑 token";
        let token = encrypt(plaintext, KEY).unwrap();
        assert_eq!(decrypt(&token, KEY).unwrap(), plaintext);
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let token1 = encrypt("same-plaintext", KEY).unwrap();
        let token2 = encrypt("same-plaintext", KEY).unwrap();

        // Random nonces make repeated encryptions differ
        assert_ne!(token1, token2);

        assert_eq!(decrypt(&token1, KEY).unwrap(), "same-plaintext");
        assert_eq!(decrypt(&token2, KEY).unwrap(), "same-plaintext");
    }

    #[test]
    fn test_wrong_key_fails() {
        let other_key = "fedcba9876543210fedcba9876543210";
        let token = encrypt("secret", KEY).unwrap();

        assert_eq!(
            decrypt(&token, other_key),
            Err(CryptoError::DecryptionFailure)
        );
    }

    #[test]
    fn test_key_longer_than_32_bytes_uses_prefix() {
        let long_key = format!("{}-extra-material-beyond-32", KEY);
        let token = encrypt("secret", &long_key).unwrap();

        // Only the first 32 bytes are key material
        assert_eq!(decrypt(&token, KEY).unwrap(), "secret");
    }

    #[test]
    fn test_short_key_rejected() {
        let short = "only-16-chars!!!";

        assert_eq!(
            encrypt("secret", short),
            Err(CryptoError::InvalidKeyLength { got: 16 })
        );
        assert_eq!(
            decrypt("irrelevant", short),
            Err(CryptoError::InvalidKeyLength { got: 16 })
        );
    }

    #[test]
    fn test_tampered_token_fails() {
        let token = encrypt("secret", KEY).unwrap();

        // Flip one character in the middle of the token
        let mut chars: Vec<char> = token.chars().collect();
        let mid = chars.len() / 2;
        chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();

        assert_eq!(decrypt(&tampered, KEY), Err(CryptoError::DecryptionFailure));
    }

    #[test]
    fn test_truncated_token_fails() {
        let token = encrypt("secret", KEY).unwrap();
        let truncated = &token[..8];

        assert_eq!(decrypt(truncated, KEY), Err(CryptoError::DecryptionFailure));
    }

    #[test]
    fn test_garbage_input_fails() {
        assert_eq!(
            decrypt("not base64 at all!!", KEY),
            Err(CryptoError::DecryptionFailure)
        );
    }
}
