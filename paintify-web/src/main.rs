//! paintify-web - image-to-media submission service
//!
//! Takes a drawn image, captions it through a generative multimodal model,
//! resolves the suggested song title to a playable catalog track, and keeps
//! each authenticated user's submissions for later browsing/removal.

use anyhow::Result;
use clap::Parser;
use paintify_common::auth::load_session_secret;
use paintify_common::config::Settings;
use paintify_common::db::init::init_database;
use paintify_web::services::{OpenAiCaptionClient, SpotifyTrackClient};
use paintify_web::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "paintify-web", version, about = "Paintify submission service")]
struct Args {
    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the database path
    #[arg(long)]
    database: Option<PathBuf>,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Tracing first, so config/database problems are visible
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting paintify-web v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(database) = args.database {
        settings.database_path = database;
    }
    if let Some(bind) = args.bind {
        settings.bind_address = bind;
    }
    settings.validate()?;

    info!("Database: {}", settings.database_path.display());
    let pool = init_database(&settings.database_path).await?;

    let session_secret = load_session_secret(&pool).await?;
    info!("Session signing secret loaded");

    // Immutable service handles, constructed once and shared
    let caption = Arc::new(OpenAiCaptionClient::new(&settings.caption)?);
    let tracks = Arc::new(SpotifyTrackClient::new(&settings.catalog)?);
    info!(model = %settings.caption.model, "Caption provider configured");

    let state = AppState::new(pool, caption, tracks, session_secret);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    info!("paintify-web listening on http://{}", settings.bind_address);
    info!("Health check: http://{}/health", settings.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
