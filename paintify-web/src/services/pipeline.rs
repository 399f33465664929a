//! Submission pipeline
//!
//! Walks one image submission through
//! dedup lookup → caption → track resolution → persistence.
//!
//! Every submission gets a fresh caption, even a resubmission of an
//! unchanged image: captioning is a query against the model, not a stored
//! property of the image. Persistence happens at most once per unique
//! payload, and only for authenticated submissions.

use crate::services::caption::CaptionService;
use crate::services::track::TrackResolver;
use paintify_common::db::images::{find_image_by_payload, save_image};
use paintify_common::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// What happened to the image row for this submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// New row written for the submitting user
    Written,
    /// Payload was already stored (dedup hit, or lost the insert race)
    AlreadyExisted,
    /// No session, nothing persisted
    SkippedAnonymous,
}

/// Terminal pipeline state, shaped into HTTP by the handler
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// Caption succeeded; `track_id` may be empty when resolution failed
    Success {
        track_id: String,
        description: String,
        persisted: PersistOutcome,
    },
    /// Caption failed; the resolver was never invoked
    CaptionFailed {
        cause: String,
        persisted: PersistOutcome,
    },
}

/// Per-submission orchestrator over the store and the two external services
pub struct SubmissionPipeline {
    db: SqlitePool,
    caption: Arc<dyn CaptionService>,
    tracks: Arc<dyn TrackResolver>,
}

impl SubmissionPipeline {
    pub fn new(
        db: SqlitePool,
        caption: Arc<dyn CaptionService>,
        tracks: Arc<dyn TrackResolver>,
    ) -> Self {
        Self { db, caption, tracks }
    }

    /// Run one submission to completion
    ///
    /// Returns Err only on store failures outside the insert race; external
    /// service failures are absorbed into the outcome.
    pub async fn run(&self, payload: &str, owner: Option<Uuid>) -> Result<SubmissionOutcome> {
        // Dedup lookup up front; a hit means no write attempt later
        let already_stored = find_image_by_payload(&self.db, payload).await?.is_some();

        // Always a fresh caption, regardless of dedup outcome
        let caption = self.caption.describe(payload).await;

        if caption.is_failure() {
            let persisted = self.persist(payload, owner, already_stored).await?;
            return Ok(SubmissionOutcome::CaptionFailed {
                cause: caption.description,
                persisted,
            });
        }

        // Searching the catalog for the literal sentinel would be
        // meaningless, so resolution only happens on the success path
        let track_id = self.tracks.resolve(&caption.music_title).await;

        let persisted = self.persist(payload, owner, already_stored).await?;

        Ok(SubmissionOutcome::Success {
            track_id,
            description: caption.description,
            persisted,
        })
    }

    async fn persist(
        &self,
        payload: &str,
        owner: Option<Uuid>,
        already_stored: bool,
    ) -> Result<PersistOutcome> {
        let Some(owner) = owner else {
            return Ok(PersistOutcome::SkippedAnonymous);
        };

        if already_stored {
            return Ok(PersistOutcome::AlreadyExisted);
        }

        match save_image(&self.db, payload, &owner).await {
            Ok(_) => Ok(PersistOutcome::Written),
            Err(e) if e.is_unique_violation() => {
                // A concurrent identical submission won the race between our
                // existence check and this insert
                debug!("Lost insert race for payload, treating as existing");
                Ok(PersistOutcome::AlreadyExisted)
            }
            Err(e) => Err(e),
        }
    }
}
