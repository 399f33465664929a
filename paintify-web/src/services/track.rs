//! Track resolver
//!
//! Maps a free-text song title to a playable Spotify track id via catalog
//! search (top-1 match). The contract is deliberately lenient: network
//! failure, auth failure, or no match all resolve to an empty id, which
//! degrades the response (no playable track) without aborting the
//! submission.

use async_trait::async_trait;
use paintify_common::config::CatalogSettings;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";
const USER_AGENT: &str = "Paintify/0.1.0 (+https://github.com/paintify/paintify)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

// Refresh slightly before the catalog's stated expiry
const TOKEN_EXPIRY_SLACK_SECS: u64 = 30;

/// Seam for the catalog search dependency (stubbed in tests)
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resolve a title to a track id, or `""` on failure/no-match.
    /// One search attempt per call, no retry.
    async fn resolve(&self, title: &str) -> String;
}

/// Track catalog errors (internal; collapsed into the empty id)
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Client-credentials bearer token with its refresh deadline
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Spotify search client
///
/// The token cache is the only interior state; everything else is fixed at
/// construction.
pub struct SpotifyTrackClient {
    http_client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyTrackClient {
    pub fn new(settings: &CatalogSettings) -> Result<Self, TrackError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TrackError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    /// Return a valid bearer token, fetching a fresh one when the cached
    /// token is absent or about to expire
    async fn access_token(&self) -> Result<String, TrackError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_valid() {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Fetching catalog access token");

        let response = self
            .http_client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| TrackError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TrackError::ApiError(status.as_u16(), error_text));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| TrackError::ParseError(e.to_string()))?;

        let ttl = token.expires_in.saturating_sub(TOKEN_EXPIRY_SLACK_SECS);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(ttl),
        });

        Ok(token.access_token)
    }

    async fn search_track(&self, title: &str) -> Result<Option<String>, TrackError> {
        let access_token = self.access_token().await?;

        let response = self
            .http_client
            .get(SEARCH_URL)
            .bearer_auth(access_token)
            .query(&[("q", title), ("type", "track"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| TrackError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TrackError::ApiError(status.as_u16(), error_text));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| TrackError::ParseError(e.to_string()))?;

        Ok(search.tracks.items.into_iter().next().map(|t| t.id))
    }
}

#[async_trait]
impl TrackResolver for SpotifyTrackClient {
    async fn resolve(&self, title: &str) -> String {
        if title.trim().is_empty() {
            return String::new();
        }

        match self.search_track(title).await {
            Ok(Some(id)) => {
                debug!(title = %title, track_id = %id, "Resolved track");
                id
            }
            Ok(None) => {
                debug!(title = %title, "No catalog match");
                String::new()
            }
            Err(e) => {
                warn!(title = %title, "Track search failed: {}", e);
                String::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    items: Vec<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_parsing() {
        let json = r#"{"access_token":"BQabc123","token_type":"Bearer","expires_in":3600}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "BQabc123");
        assert_eq!(token.expires_in, 3600);
    }

    #[test]
    fn test_search_response_top_match() {
        let json = r#"{
            "tracks": {
                "href": "https://api.spotify.com/v1/search?query=yellow",
                "items": [
                    { "id": "3AJwUDP919kvQ9QcozQPxg", "name": "Yellow" },
                    { "id": "other", "name": "Yellow Submarine" }
                ],
                "total": 2
            }
        }"#;

        let search: SearchResponse = serde_json::from_str(json).unwrap();
        let top = search.tracks.items.into_iter().next().map(|t| t.id);
        assert_eq!(top.as_deref(), Some("3AJwUDP919kvQ9QcozQPxg"));
    }

    #[test]
    fn test_search_response_no_items() {
        let json = r#"{"tracks":{"items":[],"total":0}}"#;
        let search: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(search.tracks.items.is_empty());
    }

    #[test]
    fn test_cached_token_expiry() {
        let valid = CachedToken {
            access_token: "tok".to_string(),
            expires_at: Instant::now() + Duration::from_secs(60),
        };
        assert!(valid.is_valid());

        let expired = CachedToken {
            access_token: "tok".to_string(),
            expires_at: Instant::now() - Duration::from_secs(1),
        };
        assert!(!expired.is_valid());
    }
}
