// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use crate::handlers::{sessions, users};
use crate::AppState;
use axum::{
    http::{header, Method},
    routing::any,
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the gateway router.
///
/// Routes accept any method so each handler can answer 405 itself.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::AUTHORIZATION]);

    Router::new()
        .route("/v1/users", any(users::users_handler))
        .route("/v1/users/{id}", any(users::specific_user_handler))
        .route("/v1/sessions", any(sessions::sessions_handler))
        .route("/v1/sessions/{which}", any(sessions::specific_session_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
