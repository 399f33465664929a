//! Image persistence and deduplication
//!
//! The payload text is the uniqueness key. There is no upsert: callers
//! check existence first, and the UNIQUE constraint catches the race when
//! two identical submissions arrive concurrently.

use crate::db::models::Image;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Look up an image by its payload text
pub async fn find_image_by_payload(pool: &SqlitePool, payload: &str) -> Result<Option<Image>> {
    let row = sqlx::query(
        r#"
        SELECT guid, payload, owner_guid, created_at
        FROM images
        WHERE payload = ?
        "#,
    )
    .bind(payload)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(image_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Insert a new image owned by `owner_guid`
///
/// Fails with a unique-violation error when the payload already exists;
/// callers decide whether that is a conflict or a benign no-op.
pub async fn save_image(pool: &SqlitePool, payload: &str, owner_guid: &Uuid) -> Result<Image> {
    let image = Image {
        guid: Uuid::new_v4(),
        payload: payload.to_string(),
        owner_guid: *owner_guid,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO images (guid, payload, owner_guid, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(image.guid.to_string())
    .bind(&image.payload)
    .bind(image.owner_guid.to_string())
    .bind(image.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(image)
}

/// List a user's images, most recently created first
pub async fn list_images_for_user(pool: &SqlitePool, owner_guid: &Uuid) -> Result<Vec<Image>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, payload, owner_guid, created_at
        FROM images
        WHERE owner_guid = ?
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(owner_guid.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(image_from_row).collect()
}

/// Delete an image by payload text
///
/// Returns false when no matching row existed.
pub async fn delete_image_by_payload(pool: &SqlitePool, payload: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM images WHERE payload = ?")
        .bind(payload)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn image_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Image> {
    let guid_str: String = row.get("guid");
    let guid = Uuid::parse_str(&guid_str)
        .map_err(|e| Error::Internal(format!("invalid image guid in database: {}", e)))?;

    let owner_str: String = row.get("owner_guid");
    let owner_guid = Uuid::parse_str(&owner_str)
        .map_err(|e| Error::Internal(format!("invalid owner guid in database: {}", e)))?;

    let created_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map_err(|e| Error::Internal(format!("invalid timestamp in database: {}", e)))?
        .with_timezone(&Utc);

    Ok(Image {
        guid,
        payload: row.get("payload"),
        owner_guid,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::db::users::create_user;

    #[tokio::test]
    async fn test_save_and_find() {
        let pool = init_memory_database().await.unwrap();
        let alice = create_user(&pool, "alice", "pw").await.unwrap();

        assert!(find_image_by_payload(&pool, "img:AAA").await.unwrap().is_none());

        let saved = save_image(&pool, "img:AAA", &alice.guid).await.unwrap();
        let found = find_image_by_payload(&pool, "img:AAA").await.unwrap().unwrap();
        assert_eq!(found.guid, saved.guid);
        assert_eq!(found.owner_guid, alice.guid);
    }

    #[tokio::test]
    async fn test_duplicate_payload_rejected() {
        let pool = init_memory_database().await.unwrap();
        let alice = create_user(&pool, "alice", "pw").await.unwrap();
        let bob = create_user(&pool, "bob", "pw").await.unwrap();

        save_image(&pool, "img:AAA", &alice.guid).await.unwrap();

        // Same payload, even from another owner, violates global uniqueness
        let err = save_image(&pool, "img:AAA", &bob.guid).await.unwrap_err();
        assert!(err.is_unique_violation(), "got {:?}", err);

        // Still exactly one row, owned by the first writer
        let found = find_image_by_payload(&pool, "img:AAA").await.unwrap().unwrap();
        assert_eq!(found.owner_guid, alice.guid);
    }

    #[tokio::test]
    async fn test_list_is_owner_scoped_and_newest_first() {
        let pool = init_memory_database().await.unwrap();
        let alice = create_user(&pool, "alice", "pw").await.unwrap();
        let bob = create_user(&pool, "bob", "pw").await.unwrap();

        save_image(&pool, "img:A1", &alice.guid).await.unwrap();
        save_image(&pool, "img:B1", &bob.guid).await.unwrap();
        save_image(&pool, "img:A2", &alice.guid).await.unwrap();
        save_image(&pool, "img:A3", &alice.guid).await.unwrap();

        let images = list_images_for_user(&pool, &alice.guid).await.unwrap();
        let payloads: Vec<&str> = images.iter().map(|i| i.payload.as_str()).collect();
        assert_eq!(payloads, vec!["img:A3", "img:A2", "img:A1"]);
    }

    #[tokio::test]
    async fn test_delete_by_payload() {
        let pool = init_memory_database().await.unwrap();
        let alice = create_user(&pool, "alice", "pw").await.unwrap();

        save_image(&pool, "img:AAA", &alice.guid).await.unwrap();

        assert!(delete_image_by_payload(&pool, "img:AAA").await.unwrap());
        assert!(find_image_by_payload(&pool, "img:AAA").await.unwrap().is_none());
        assert!(list_images_for_user(&pool, &alice.guid).await.unwrap().is_empty());

        // Second delete finds nothing
        assert!(!delete_image_by_payload(&pool, "img:AAA").await.unwrap());
    }
}
