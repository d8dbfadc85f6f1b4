// ============================
// crates/backend-lib/src/handlers/users.rs
// ============================
//! The `users` resource: registration and self profile.
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
    Json,
};
use gateway_common::{NewUser, Updates, User, UserId};
use metrics::counter;
use zeroize::Zeroize;

use super::{begin_new_session, decode_json, require_json};
use crate::auth::{hash_password_secure, HashCost, SessionId, SessionState};
use crate::error::AppError;
use crate::metrics::{USER_REGISTERED, USER_STORE_DIVERGED};
use crate::storage::StoreError;
use crate::validation::{normalize_email, validate_new_user, validate_updates, ValidationError};
use crate::AppState;

/// Path segment naming the signed-in user
pub const ME: &str = "me";

/// `POST /v1/users`: create an account and sign it in
#[tracing::instrument(name = "register", skip_all)]
pub async fn users_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if method != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }
    require_json(&headers)?;

    let mut new_user: NewUser = decode_json(&body)?;
    new_user.email = normalize_email(&new_user.email);
    validate_new_user(&new_user, state.settings.password.min_length)?;

    ensure_absent(state.users.get_by_email(&new_user.email).await, "email already registered")?;
    ensure_absent(
        state.users.get_by_user_name(&new_user.user_name).await,
        "user name already taken",
    )?;

    let user = derive_user(new_user, state.settings.hash_cost).await?;
    // the store is the authority on uniqueness; a race surfaces here as Conflict
    let user = state.users.insert(user).await?;

    counter!(USER_REGISTERED).increment(1);
    tracing::info!(user_id = user.id, "user registered");

    begin_new_session(&state, user).await
}

/// `GET|PATCH /v1/users/{id|me}`
#[tracing::instrument(name = "self_profile", skip_all, fields(method = %method))]
pub async fn specific_user_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(target): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if method != Method::GET && method != Method::PATCH {
        return Err(AppError::MethodNotAllowed);
    }

    let (session_id, session): (SessionId, SessionState) =
        state.sessions.get_state(&headers).await?;
    let target_id = resolve_target(&target, &session.user)?;

    if method == Method::GET {
        let user = state.users.get_by_id(target_id).await?;
        return Ok(Json(user).into_response());
    }

    if target_id != session.user.id {
        return Err(AppError::Forbidden(format!(
            "user {} may not modify user {target_id}",
            session.user.id
        )));
    }

    require_json(&headers)?;
    let updates: Updates = decode_json(&body)?;
    validate_updates(&updates)?;

    let user = apply_updates(&state, &session_id, session, &updates).await?;
    Ok(Json(user).into_response())
}

/// Write the update to the session first, then to the user store
async fn apply_updates(
    state: &AppState,
    session_id: &SessionId,
    mut session: SessionState,
    updates: &Updates,
) -> Result<User, AppError> {
    session.user.apply_updates(updates);
    state.sessions.save_state(session_id, &session).await?;

    let user_id = session.user.id;
    state.users.update(user_id, updates).await.map_err(|e| {
        // the session now holds changes the user store lacks
        counter!(USER_STORE_DIVERGED).increment(1);
        tracing::error!(user_id, error = %e, "session updated but user store write failed");
        AppError::StoreWrite(e.to_string())
    })
}

/// Turn a path segment into a user ID
fn resolve_target(target: &str, me: &User) -> Result<UserId, AppError> {
    if target == ME {
        return Ok(me.id);
    }
    target
        .parse::<UserId>()
        .map_err(|_| ValidationError::UserId(format!("{target:?} is neither \"{ME}\" nor a number")).into())
}

/// `Ok` only when the lookup found nothing
fn ensure_absent(lookup: Result<User, StoreError>, conflict: &str) -> Result<(), AppError> {
    match lookup {
        Ok(_) => Err(AppError::Conflict(conflict.to_string())),
        Err(StoreError::NotFound) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Derive the stored user from a validated registration, discarding the
/// plaintext password.
async fn derive_user(mut new_user: NewUser, cost: HashCost) -> Result<User, AppError> {
    let mut password = std::mem::take(&mut new_user.password);
    new_user.password_confirm.zeroize();

    let pass_hash = tokio::task::spawn_blocking(move || hash_password_secure(&mut password, &cost))
        .await?
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(User {
        id: 0,
        email: new_user.email,
        user_name: new_user.user_name,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
        pass_hash,
    })
}
