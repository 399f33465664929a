//! Password hashing and session-token signing
//!
//! # Passwords
//!
//! Stored as argon2 PHC strings with a per-user random salt. Verification
//! is constant-time inside the argon2 crate. The service never stores or
//! compares plain-text passwords.
//!
//! # Sessions
//!
//! There is no server-side session registry. A session is a cookie value
//! `"<user-guid>.<expiry-ms>.<signature>"` where the signature is
//! HMAC-SHA256 over the first two fields with a secret generated on first
//! run and kept in the settings table. Expiry is checked on every request;
//! a tampered or expired token is simply an anonymous request.

use crate::{Error, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::SqlitePool;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Default session lifetime: 30 days
pub const SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

const SESSION_SECRET_KEY: &str = "session_secret";

// ========================================
// Password Hashing
// ========================================

/// Hash a password with a fresh random salt, returning a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string
///
/// Returns Ok(false) on mismatch; Err only when the stored hash is
/// unparseable (corrupt row).
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| Error::Internal(format!("invalid stored password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// ========================================
// Session Secret Bootstrap
// ========================================

/// Load the session signing secret from the settings table, generating and
/// storing one on first run.
pub async fn load_session_secret(pool: &SqlitePool) -> Result<String> {
    let existing: Option<(String,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(SESSION_SECRET_KEY)
            .fetch_optional(pool)
            .await?;

    if let Some((value,)) = existing {
        if !value.is_empty() {
            return Ok(value);
        }
    }

    initialize_session_secret(pool).await
}

/// Generate a fresh random secret and store it
async fn initialize_session_secret(pool: &SqlitePool) -> Result<String> {
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let secret = hex::encode(bytes);

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(SESSION_SECRET_KEY)
        .bind(&secret)
        .execute(pool)
        .await?;

    Ok(secret)
}

// ========================================
// Session Tokens
// ========================================

/// Sign a session token for a user, expiring `ttl_secs` from now
pub fn sign_session(user_guid: &Uuid, ttl_secs: i64, secret: &str) -> String {
    let expires_at_ms = now_ms() + ttl_secs * 1000;
    let body = format!("{}.{}", user_guid, expires_at_ms);
    let signature = hmac_hex(&body, secret);
    format!("{}.{}", body, signature)
}

/// Verify a session token, returning the user guid when the signature is
/// valid and the token has not expired
pub fn verify_session(token: &str, secret: &str) -> Option<Uuid> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let guid = Uuid::parse_str(parts[0]).ok()?;
    let expires_at_ms: i64 = parts[1].parse().ok()?;

    let body = format!("{}.{}", parts[0], parts[1]);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body.as_bytes());
    let provided = hex::decode(parts[2]).ok()?;
    mac.verify_slice(&provided).ok()?;

    if expires_at_ms <= now_ms() {
        return None;
    }

    Some(guid)
}

fn hmac_hex(data: &str, secret: &str) -> String {
    // new_from_slice accepts any key length for HMAC
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(hash.starts_with("$argon2"));

        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_salt() {
        let h1 = hash_password("pw").unwrap();
        let h2 = hash_password("pw").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_corrupt_hash_is_error() {
        assert!(verify_password("pw", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_session_token_roundtrip() {
        let guid = Uuid::new_v4();
        let token = sign_session(&guid, SESSION_TTL_SECS, "secret");

        assert_eq!(verify_session(&token, "secret"), Some(guid));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let guid = Uuid::new_v4();
        let token = sign_session(&guid, SESSION_TTL_SECS, "secret");

        // Wrong secret
        assert_eq!(verify_session(&token, "other"), None);

        // Flipped signature byte
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert_eq!(verify_session(&tampered, "secret"), None);

        // Substituted guid keeps the old signature
        let other = Uuid::new_v4();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", other, parts[1], parts[2]);
        assert_eq!(verify_session(&forged, "secret"), None);

        // Garbage
        assert_eq!(verify_session("nonsense", "secret"), None);
    }

    #[test]
    fn test_expired_token_rejected() {
        let guid = Uuid::new_v4();
        let token = sign_session(&guid, -10, "secret");
        assert_eq!(verify_session(&token, "secret"), None);
    }

    #[tokio::test]
    async fn test_secret_bootstrap_is_stable() {
        let pool = init_memory_database().await.unwrap();

        let first = load_session_secret(&pool).await.unwrap();
        assert_eq!(first.len(), 64);

        // Second load returns the stored secret, not a new one
        let second = load_session_secret(&pool).await.unwrap();
        assert_eq!(first, second);
    }
}
