//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered account. Owns zero or more images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub guid: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Stored submission. The payload (a data URI) is unique across the whole
/// store, not per owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub guid: Uuid,
    pub payload: String,
    pub owner_guid: Uuid,
    pub created_at: DateTime<Utc>,
}
