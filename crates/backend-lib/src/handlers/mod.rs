// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP resource handlers.
//!
//! Each handler checks the method first, then the content type where a
//! body is expected, and only then decodes and validates the payload.

pub mod sessions;
pub mod users;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gateway_common::User;
use serde::de::DeserializeOwned;

use crate::auth::SessionState;
use crate::error::AppError;
use crate::AppState;

const CONTENT_TYPE_JSON: &str = "application/json";

/// Reject bodies that are not declared as JSON
pub(crate) fn require_json(headers: &HeaderMap) -> Result<(), AppError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with(CONTENT_TYPE_JSON));
    if is_json {
        Ok(())
    } else {
        Err(AppError::UnsupportedMediaType)
    }
}

/// Decode a JSON body into `T`
pub(crate) fn decode_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::InvalidJson(e.to_string()))
}

/// Begin a session for `user` and answer 201 with the user and the token
/// attached to the response.
pub(crate) async fn begin_new_session(state: &AppState, user: User) -> Result<Response, AppError> {
    let session = SessionState::new(user);
    let mut headers = HeaderMap::new();
    state.sessions.begin_session_into(&session, &mut headers).await?;

    tracing::info!(user_id = session.user.id, "session begun");
    Ok((StatusCode::CREATED, headers, Json(session.user)).into_response())
}
