// ============================
// crates/backend-lib/src/handlers/sessions.rs
// ============================
//! The `sessions` resource: sign-in and sign-out.
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use gateway_common::{Credentials, User};
use metrics::counter;
use zeroize::Zeroize;

use super::{begin_new_session, decode_json, require_json};
use crate::auth::verify_password;
use crate::error::AppError;
use crate::metrics::SIGN_IN_FAILED;
use crate::storage::StoreError;
use crate::validation::normalize_email;
use crate::AppState;

/// Path segment naming the caller's own session
pub const MINE: &str = "mine";

/// `POST /v1/sessions`: sign in with email and password.
///
/// An unknown email and a wrong password produce the same error.
#[tracing::instrument(name = "sign_in", skip_all)]
pub async fn sessions_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if method != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }
    require_json(&headers)?;

    let credentials: Credentials = decode_json(&body)?;
    let email = normalize_email(&credentials.email);

    if !state.sign_in_limiter.check(&email) {
        return Err(AppError::TooManyAttempts);
    }

    let found = match state.users.get_by_email(&email).await {
        Ok(user) => Some(user),
        Err(StoreError::NotFound) => None,
        Err(e) => return Err(e.into()),
    };

    match authenticate(found, credentials.password, state.decoy_hash.clone()).await? {
        Some(user) => {
            state.sign_in_limiter.record_success(&email);
            begin_new_session(&state, user).await
        },
        None => {
            state.sign_in_limiter.record_failure(&email);
            counter!(SIGN_IN_FAILED).increment(1);
            tracing::info!("sign-in rejected");
            Err(AppError::InvalidCredentials)
        },
    }
}

/// Check `password` against the user's stored credential.
///
/// An unknown email is checked against `decoy_hash` instead, so both
/// outcomes cost one scrypt verification.
async fn authenticate(
    found: Option<User>,
    mut password: String,
    decoy_hash: Arc<str>,
) -> Result<Option<User>, AppError> {
    let stored_hash = hash_to_check(found.as_ref(), &decoy_hash).to_string();
    let matches = tokio::task::spawn_blocking(move || {
        let ok = verify_password(&stored_hash, &password);
        password.zeroize();
        ok
    })
    .await?;

    // a decoy match never signs anyone in
    Ok(found.filter(|_| matches))
}

fn hash_to_check<'a>(found: Option<&'a User>, decoy_hash: &'a str) -> &'a str {
    found.map_or(decoy_hash, |user| user.pass_hash.as_str())
}

/// `DELETE /v1/sessions/mine`: end the caller's session
#[tracing::instrument(name = "sign_out", skip_all)]
pub async fn specific_session_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(which): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if method != Method::DELETE {
        return Err(AppError::MethodNotAllowed);
    }
    if which != MINE {
        return Err(AppError::Forbidden(format!("cannot end session {which:?}")));
    }

    let mut response_headers = HeaderMap::new();
    state.sessions.end_session(&headers, &mut response_headers).await?;

    tracing::info!("session ended");
    Ok((StatusCode::OK, response_headers, "signed out").into_response())
}
