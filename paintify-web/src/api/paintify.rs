//! Image submission endpoint
//!
//! `POST /paintify` (also mounted at `POST /`, where the original drawing
//! client posts): takes `{"data": <image payload>}`, runs the submission
//! pipeline, and answers `{"id": <track id>, "description": …}`.
//!
//! A caption failure is reported as 400 with the extracted cause in the
//! `description` field, the status mapping the drawing client expects.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::api::session::session_user;
use crate::services::{SubmissionOutcome, SubmissionPipeline};
use crate::AppState;

/// Submission request body
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Image payload as a self-describing text blob (data URI)
    pub data: String,
}

/// Submission success response
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Catalog track id; empty when resolution found nothing
    pub id: String,
    pub description: String,
}

/// POST /paintify
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, SubmitError> {
    if req.data.trim().is_empty() {
        return Err(SubmitError::EmptyPayload);
    }

    // Anonymous submissions still get caption/track data, just no storage
    let owner = session_user(&headers, &state.session_secret);

    let pipeline = SubmissionPipeline::new(
        state.db.clone(),
        state.caption.clone(),
        state.tracks.clone(),
    );

    let outcome = pipeline
        .run(&req.data, owner)
        .await
        .map_err(|e| SubmitError::Store(e.to_string()))?;

    match outcome {
        SubmissionOutcome::Success {
            track_id,
            description,
            persisted,
        } => {
            info!(?persisted, has_track = !track_id.is_empty(), "Submission completed");
            Ok(Json(SubmitResponse {
                id: track_id,
                description,
            }))
        }
        SubmissionOutcome::CaptionFailed { cause, .. } => {
            warn!(cause = %cause, "Submission failed at captioning");
            Err(SubmitError::CaptionFailed(cause))
        }
    }
}

/// Submission handler errors
#[derive(Debug)]
pub enum SubmitError {
    /// Request carried no image data
    EmptyPayload,
    /// Provider failure, surfaced to the user with the extracted cause
    CaptionFailed(String),
    /// Store failure outside the tolerated insert race
    Store(String),
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        match self {
            SubmitError::EmptyPayload => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "description": "No image data submitted" })),
            )
                .into_response(),
            // The client reads the cause from `description`
            SubmitError::CaptionFailed(cause) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "description": cause })),
            )
                .into_response(),
            SubmitError::Store(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "description": msg })),
            )
                .into_response(),
        }
    }
}
