//! Session lifecycle: signup, login, logout
//!
//! A session is a signed cookie holding the user guid; there is no
//! server-side session registry. Handlers here are the only place the
//! cookie is minted or cleared, and `session_user` is the only place it is
//! read.

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use paintify_common::auth::{sign_session, verify_session, SESSION_TTL_SECS};
use paintify_common::db::users::{authenticate_user, create_user};
use paintify_common::Error;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::AppState;

/// Session cookie name
pub const SESSION_COOKIE: &str = "paintify_session";

/// Signup/login request body
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Signup/login response body
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub username: String,
}

/// Extract the authenticated user guid from the request cookies, if any.
///
/// Missing, tampered or expired tokens all degrade to anonymous (`None`);
/// no request is rejected for a bad cookie.
pub fn session_user(headers: &HeaderMap, session_secret: &str) -> Option<Uuid> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;

    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name != SESSION_COOKIE {
            return None;
        }
        verify_session(value, session_secret)
    })
}

/// POST /signup
///
/// Creates a user when the normalized name is free and establishes a
/// session in the same response. Duplicate name → 409.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Response, SessionError> {
    let user = create_user(&state.db, &req.username, &req.password)
        .await
        .map_err(SessionError::from)?;

    info!(username = %user.username, "User created");

    session_response(
        &state,
        &user.guid,
        SessionResponse {
            message: "Account created".to_string(),
            username: user.username,
        },
    )
}

/// POST /login
///
/// Establishes a session cookie bound to the user guid on credential
/// match; 401 otherwise.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Response, SessionError> {
    let user = authenticate_user(&state.db, &req.username, &req.password)
        .await
        .map_err(SessionError::from)?
        .ok_or(SessionError::InvalidCredentials)?;

    info!(username = %user.username, "User logged in");

    session_response(
        &state,
        &user.guid,
        SessionResponse {
            message: "Logged in".to_string(),
            username: user.username,
        },
    )
}

/// GET /logout
///
/// Clears the cookie. Always succeeds, session or not.
pub async fn logout() -> Response {
    let clear = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);

    let mut response = Json(json!({ "message": "Logged out" })).into_response();
    if let Ok(value) = HeaderValue::from_str(&clear) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

fn session_response(
    state: &AppState,
    user_guid: &Uuid,
    body: SessionResponse,
) -> Result<Response, SessionError> {
    let token = sign_session(user_guid, SESSION_TTL_SECS, &state.session_secret);
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_TTL_SECS
    );
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| SessionError::Internal(format!("invalid cookie value: {}", e)))?;

    let mut response = (StatusCode::OK, Json(body)).into_response();
    response.headers_mut().insert(header::SET_COOKIE, value);
    Ok(response)
}

/// Session handler errors
#[derive(Debug)]
pub enum SessionError {
    /// Username already taken (case-insensitive)
    Conflict(String),
    /// Login credential mismatch; never reveals which field was wrong
    InvalidCredentials,
    /// Empty username/password
    InvalidInput(String),
    /// Store failure
    Internal(String),
}

impl From<Error> for SessionError {
    fn from(e: Error) -> Self {
        match e {
            Error::Conflict(msg) => SessionError::Conflict(msg),
            Error::InvalidInput(msg) => SessionError::InvalidInput(msg),
            other => SessionError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            SessionError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            SessionError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password".to_string())
            }
            SessionError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            SessionError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
