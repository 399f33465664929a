//! User account operations
//!
//! Accounts are created on signup and never mutated or deleted afterwards.
//! Credential verification goes through argon2; the stored hash never
//! leaves this module.

use crate::auth::{hash_password, verify_password};
use crate::db::models::User;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Create a new user
///
/// Username uniqueness is case-insensitive and enforced by the schema; a
/// duplicate name returns `Error::Conflict` rather than a new row.
pub async fn create_user(pool: &SqlitePool, username: &str, password: &str) -> Result<User> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::InvalidInput("username must not be empty".to_string()));
    }
    if password.is_empty() {
        return Err(Error::InvalidInput("password must not be empty".to_string()));
    }

    let user = User {
        guid: Uuid::new_v4(),
        username: username.to_string(),
        created_at: Utc::now(),
    };
    let password_hash = hash_password(password)?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (guid, username, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.guid.to_string())
    .bind(&user.username)
    .bind(&password_hash)
    .bind(user.created_at.to_rfc3339())
    .bind(user.created_at.to_rfc3339())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(user),
        Err(e) => {
            let wrapped = Error::from(e);
            if wrapped.is_unique_violation() {
                Err(Error::Conflict(format!("username already taken: {}", username)))
            } else {
                Err(wrapped)
            }
        }
    }
}

/// Verify credentials and return the matching user
///
/// Returns `None` for both "no such user" and "wrong password"; callers
/// cannot distinguish the two. Verification is constant-time inside argon2.
pub async fn authenticate_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT guid, username, password_hash, created_at
        FROM users
        WHERE username = ? COLLATE NOCASE
        "#,
    )
    .bind(username.trim())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let password_hash: String = row.get("password_hash");
    if !verify_password(password, &password_hash)? {
        return Ok(None);
    }

    Ok(Some(user_from_row(&row)?))
}

/// Load a user by guid (session cookie holds the guid)
pub async fn load_user(pool: &SqlitePool, guid: &Uuid) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT guid, username, password_hash, created_at
        FROM users
        WHERE guid = ?
        "#,
    )
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(user_from_row(&row)?)),
        None => Ok(None),
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let guid_str: String = row.get("guid");
    let guid = Uuid::parse_str(&guid_str)
        .map_err(|e| Error::Internal(format!("invalid user guid in database: {}", e)))?;

    let created_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map_err(|e| Error::Internal(format!("invalid timestamp in database: {}", e)))?
        .with_timezone(&Utc);

    Ok(User {
        guid,
        username: row.get("username"),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;

    #[tokio::test]
    async fn test_create_and_authenticate() {
        let pool = init_memory_database().await.unwrap();

        let user = create_user(&pool, "alice", "hunter2").await.unwrap();
        assert_eq!(user.username, "alice");

        let found = authenticate_user(&pool, "alice", "hunter2").await.unwrap();
        assert_eq!(found.unwrap().guid, user.guid);

        let wrong = authenticate_user(&pool, "alice", "wrong").await.unwrap();
        assert!(wrong.is_none());

        let missing = authenticate_user(&pool, "bob", "hunter2").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_is_case_insensitive() {
        let pool = init_memory_database().await.unwrap();

        create_user(&pool, "Alice", "pw1").await.unwrap();
        let err = create_user(&pool, "alice", "pw2").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "got {:?}", err);

        // Login matches regardless of case
        let found = authenticate_user(&pool, "ALICE", "pw1").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected() {
        let pool = init_memory_database().await.unwrap();

        assert!(create_user(&pool, "  ", "pw").await.is_err());
        assert!(create_user(&pool, "carol", "").await.is_err());
    }

    #[tokio::test]
    async fn test_load_user_by_guid() {
        let pool = init_memory_database().await.unwrap();

        let user = create_user(&pool, "dave", "pw").await.unwrap();
        let loaded = load_user(&pool, &user.guid).await.unwrap().unwrap();
        assert_eq!(loaded.username, "dave");

        let missing = load_user(&pool, &Uuid::new_v4()).await.unwrap();
        assert!(missing.is_none());
    }
}
