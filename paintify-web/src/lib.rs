//! paintify-web library - image-to-media submission service
//!
//! Routes, application state, and the external service clients behind the
//! submission pipeline.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;

pub mod api;
pub mod services;

use services::{CaptionService, TrackResolver};

/// Application state shared across HTTP handlers
///
/// The service handles are constructed once at startup and immutable
/// afterwards; the pool is the only shared mutable resource.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Generative model client
    pub caption: Arc<dyn CaptionService>,
    /// Catalog search client
    pub tracks: Arc<dyn TrackResolver>,
    /// Secret for session-cookie signing
    pub session_secret: String,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        caption: Arc<dyn CaptionService>,
        tracks: Arc<dyn TrackResolver>,
        session_secret: String,
    ) -> Self {
        Self {
            db,
            caption,
            tracks,
            session_secret,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    Router::new()
        // The original drawing client posts submissions to the root
        .route("/", post(api::submit))
        .route("/paintify", post(api::submit))
        .route("/imgs", get(api::list_images))
        .route("/remove", post(api::remove_image))
        .route("/signup", post(api::signup))
        .route("/login", post(api::login))
        .route("/logout", get(api::logout))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
