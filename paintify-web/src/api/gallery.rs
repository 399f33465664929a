//! Gallery browsing and removal
//!
//! Thin CRUD over the session-scoped view of the image store.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use paintify_common::db::images::{delete_image_by_payload, list_images_for_user};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::api::session::session_user;
use crate::AppState;

/// GET /imgs response
#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub authenticated: bool,
    pub images: Vec<GalleryImage>,
}

#[derive(Debug, Serialize)]
pub struct GalleryImage {
    pub data: String,
    pub created_at: DateTime<Utc>,
}

/// POST /remove request body
#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    /// Payload text of the image to delete
    pub data: String,
}

/// GET /imgs
///
/// The authenticated session's images, most recent first. Anonymous
/// sessions get the empty view rather than an error.
pub async fn list_images(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GalleryResponse>, GalleryError> {
    let Some(owner) = session_user(&headers, &state.session_secret) else {
        return Ok(Json(GalleryResponse {
            authenticated: false,
            images: Vec::new(),
        }));
    };

    let images = list_images_for_user(&state.db, &owner)
        .await
        .map_err(|e| GalleryError::Internal(e.to_string()))?;

    Ok(Json(GalleryResponse {
        authenticated: true,
        images: images
            .into_iter()
            .map(|img| GalleryImage {
                data: img.payload,
                created_at: img.created_at,
            })
            .collect(),
    }))
}

/// POST /remove
///
/// Deletes the row matching the payload text. Removal requires a session;
/// the row is keyed by payload alone, matching the original contract.
pub async fn remove_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RemoveRequest>,
) -> Result<Json<serde_json::Value>, GalleryError> {
    if session_user(&headers, &state.session_secret).is_none() {
        return Err(GalleryError::Unauthenticated);
    }

    let deleted = delete_image_by_payload(&state.db, &req.data)
        .await
        .map_err(|e| GalleryError::Internal(e.to_string()))?;

    if !deleted {
        return Err(GalleryError::NotFound);
    }

    info!("Image removed");
    Ok(Json(json!({ "message": "Image removed" })))
}

/// Gallery handler errors
#[derive(Debug)]
pub enum GalleryError {
    Unauthenticated,
    NotFound,
    Internal(String),
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            GalleryError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Login required".to_string())
            }
            GalleryError::NotFound => (StatusCode::NOT_FOUND, "No such image".to_string()),
            GalleryError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
