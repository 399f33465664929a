//! Integration tests for database initialization
//!
//! Covers automatic creation on first run, idempotent re-initialization,
//! and schema-level enforcement of the payload uniqueness constraint.

use paintify_common::db::init::init_database;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("paintify.db");

    assert!(!db_path.exists());

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists(), "Database file was not created");

    drop(pool);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("paintify.db");

    let pool1 = init_database(&db_path).await.unwrap();
    drop(pool1);

    // Re-initialization over an existing file succeeds (idempotent schema)
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_schema_tables_exist() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("paintify.db");
    let pool = init_database(&db_path).await.unwrap();

    for table in ["users", "images", "settings"] {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1, "missing table: {}", table);
    }
}

#[tokio::test]
async fn test_payload_uniqueness_enforced_by_schema() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("paintify.db");
    let pool = init_database(&db_path).await.unwrap();

    let alice = paintify_common::db::users::create_user(&pool, "alice", "pw")
        .await
        .unwrap();

    paintify_common::db::images::save_image(&pool, "img:AAA", &alice.guid)
        .await
        .unwrap();

    // Raw insert bypassing the query layer still hits the constraint
    let result = sqlx::query("INSERT INTO images (guid, payload, owner_guid, created_at) VALUES (?, ?, ?, ?)")
        .bind(uuid::Uuid::new_v4().to_string())
        .bind("img:AAA")
        .bind(alice.guid.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&pool)
        .await;

    assert!(result.is_err(), "duplicate payload insert should fail");
}
