// ===================================
// tests/integration/auth_flow_tests.rs
// ===================================
//! Registration, sign-in and sign-out through the router.
use crate::test_utils::*;
use async_trait::async_trait;
use axum::http::{header, Method, StatusCode};
use gateway_common::{Updates, User, UserId};
use gateway_lib::auth::HashCost;
use gateway_lib::storage::{MemSessionStore, MemUserStore, StoreError, UserStore};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_register_then_read_me() {
    let (app, _state) = setup_test_env();

    let body = json!({
        "email": "a@x.com",
        "password": "secret123",
        "passwordConfirm": "secret123",
        "userName": "alice"
    });
    let (status, headers, raw) = send(&app, request(Method::POST, "/v1/users", None, Some(&body))).await;

    assert_eq!(status, StatusCode::CREATED);
    let text = String::from_utf8(raw.to_vec()).unwrap();
    assert!(text.contains(r#""userName":"alice""#));
    assert!(!text.contains("password"));
    assert!(!text.to_lowercase().contains("hash"));
    let created: User = serde_json::from_str(&text).unwrap();

    let token = bearer_token(&headers).expect("token in Authorization header");
    let (status, _, raw) = send(&app, request(Method::GET, "/v1/users/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let me: User = serde_json::from_slice(&raw).unwrap();
    assert_eq!(me, created);
}

#[tokio::test]
async fn test_register_then_sign_in() {
    let (app, _state) = setup_test_env();
    let (user, first_token) = register(&app, "a@x.com", "alice", "secret123").await;

    let (status, headers, raw) = sign_in(&app, "a@x.com", "secret123").await;
    assert_eq!(status, StatusCode::CREATED);
    let signed_in: User = serde_json::from_slice(&raw).unwrap();
    assert_eq!(signed_in.id, user.id);

    let second_token = bearer_token(&headers).unwrap();
    assert_ne!(first_token, second_token);

    // both sessions are live
    for token in [&first_token, &second_token] {
        let (status, _, _) = send(&app, request(Method::GET, "/v1/users/me", Some(token), None)).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_sign_in_email_is_case_insensitive() {
    let (app, _state) = setup_test_env();
    register(&app, "A@X.com", "alice", "secret123").await;

    let (status, _, _) = sign_in(&app, " a@x.COM ", "secret123").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_failed_sign_ins_are_indistinguishable() {
    let (app, _state) = setup_test_env();
    register(&app, "a@x.com", "alice", "secret123").await;

    let wrong_password = sign_in(&app, "a@x.com", "secret124").await;
    let unknown_email = sign_in(&app, "nobody@x.com", "secret123").await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.0, unknown_email.0);
    assert_eq!(wrong_password.2, unknown_email.2);
    assert!(bearer_token(&wrong_password.1).is_none());
    assert!(bearer_token(&unknown_email.1).is_none());
}

#[tokio::test]
async fn test_unknown_email_costs_a_hash_verification() {
    let mut settings = test_settings();
    settings.hash_cost = HashCost { log_n: 10, r: 8, p: 1 };
    let (app, _state) = setup_with(
        settings,
        Arc::new(MemUserStore::new()),
        Arc::new(MemSessionStore::new(Duration::from_secs(60))),
    );
    register(&app, "a@x.com", "alice", "secret123").await;

    async fn timed(app: &axum::Router, email: &str) -> Duration {
        let mut total = Duration::ZERO;
        for _ in 0..3 {
            let started = Instant::now();
            let (status, _, _) = sign_in(app, email, "wrong-password").await;
            total += started.elapsed();
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        total
    }

    let known = timed(&app, "a@x.com").await;
    let unknown = timed(&app, "nobody@x.com").await;
    assert!(
        unknown * 4 >= known,
        "unknown email answered in {unknown:?}, known email in {known:?}"
    );
}

#[tokio::test]
async fn test_repeated_failures_lock_sign_in() {
    let (app, state) = setup_test_env();
    register(&app, "a@x.com", "alice", "secret123").await;

    for _ in 0..state.settings.sign_in.max_attempts {
        let (status, _, _) = sign_in(&app, "a@x.com", "wrong-password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // even the right password is refused while locked
    let (status, _, _) = sign_in(&app, "a@x.com", "secret123").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_sign_out_is_not_idempotent() {
    let (app, _state) = setup_test_env();
    let (_, token) = register(&app, "a@x.com", "alice", "secret123").await;

    let (status, _, raw) = send(&app, request(Method::DELETE, "/v1/sessions/mine", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&raw[..], b"signed out");

    let (status, _, _) = send(&app, request(Method::GET, "/v1/users/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, again) = send(&app, request(Method::DELETE, "/v1/sessions/mine", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // same answer as a caller who never signed in
    let (never_status, _, never) = send(&app, request(Method::DELETE, "/v1/sessions/mine", None, None)).await;
    assert_eq!(never_status, status);
    assert_eq!(never, again);
}

#[tokio::test]
async fn test_sign_out_other_session_forbidden() {
    let (app, _state) = setup_test_env();
    let (_, token) = register(&app, "a@x.com", "alice", "secret123").await;

    let (status, _, _) = send(&app, request(Method::DELETE, "/v1/sessions/yours", Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // session survives
    let (status, _, _) = send(&app, request(Method::GET, "/v1/users/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let (app, _state) = setup_test_env();
    let (_, token) = register(&app, "a@x.com", "alice", "secret123").await;

    let (id, signature) = token.split_once('.').unwrap();
    let mut chars: Vec<char> = id.chars().collect();
    chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
    let forged = format!("{}.{signature}", chars.into_iter().collect::<String>());

    let (status, _, body) = send(&app, request(Method::GET, "/v1/users/me", Some(&forged), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(&body[..], b"no valid session");
}

#[tokio::test]
async fn test_wrong_methods() {
    let (app, _state) = setup_test_env();

    let cases = [
        (Method::GET, "/v1/users"),
        (Method::PUT, "/v1/users"),
        (Method::DELETE, "/v1/users/me"),
        (Method::GET, "/v1/sessions"),
        (Method::POST, "/v1/sessions/mine"),
    ];
    for (method, uri) in cases {
        let (status, _, _) = send(&app, request(method.clone(), uri, None, Some(&json!({})))).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_non_json_bodies_rejected() {
    let (app, _state) = setup_test_env();

    for uri in ["/v1/users", "/v1/sessions"] {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(axum::body::Body::from("email=a@x.com"))
            .unwrap();
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE, "{uri}");
    }
}

#[tokio::test]
async fn test_invalid_json_rejected() {
    let (app, _state) = setup_test_env();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/v1/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validation_failures_name_the_rule() {
    let (app, state) = setup_test_env();

    let mismatch = json!({
        "email": "a@x.com",
        "password": "secret123",
        "passwordConfirm": "secret124",
        "userName": "alice"
    });
    let (status, headers, body) = send(&app, request(Method::POST, "/v1/users", None, Some(&mismatch))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).contains("do not match"));
    assert!(bearer_token(&headers).is_none());

    let bad_email = new_user_json("not-an-email", "alice", "secret123");
    let (status, _, body) = send(&app, request(Method::POST, "/v1/users", None, Some(&bad_email))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).contains("email"));

    let no_name = new_user_json("a@x.com", "", "secret123");
    let (status, _, _) = send(&app, request(Method::POST, "/v1/users", None, Some(&no_name))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(state.users.get_by_email("a@x.com").await.is_err());
}

#[tokio::test]
async fn test_duplicate_identity_conflicts() {
    let (app, _state) = setup_test_env();
    register(&app, "a@x.com", "alice", "secret123").await;

    let same_email = new_user_json("a@x.com", "alice2", "secret123");
    let (status, headers, _) = send(&app, request(Method::POST, "/v1/users", None, Some(&same_email))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(bearer_token(&headers).is_none());

    let same_name = new_user_json("b@x.com", "alice", "secret123");
    let (status, _, _) = send(&app, request(Method::POST, "/v1/users", None, Some(&same_name))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Passes every uniqueness pre-check, then loses the race at insert time
struct RacingUserStore;

#[async_trait]
impl UserStore for RacingUserStore {
    async fn insert(&self, _user: User) -> Result<User, StoreError> {
        Err(StoreError::Conflict("email already registered".to_string()))
    }
    async fn get_by_email(&self, _email: &str) -> Result<User, StoreError> {
        Err(StoreError::NotFound)
    }
    async fn get_by_user_name(&self, _user_name: &str) -> Result<User, StoreError> {
        Err(StoreError::NotFound)
    }
    async fn get_by_id(&self, _id: UserId) -> Result<User, StoreError> {
        Err(StoreError::NotFound)
    }
    async fn update(&self, _id: UserId, _updates: &Updates) -> Result<User, StoreError> {
        Err(StoreError::NotFound)
    }
}

#[tokio::test]
async fn test_insert_race_is_conflict() {
    let (app, _state) = setup_with(
        test_settings(),
        Arc::new(RacingUserStore),
        Arc::new(MemSessionStore::new(Duration::from_secs(60))),
    );

    let body = new_user_json("a@x.com", "alice", "secret123");
    let (status, headers, _) = send(&app, request(Method::POST, "/v1/users", None, Some(&body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(bearer_token(&headers).is_none());
}

#[tokio::test]
async fn test_concurrent_registrations_single_winner() {
    let users = Arc::new(MemUserStore::new());
    let (app, _state) = setup_with(
        test_settings(),
        users.clone(),
        Arc::new(MemSessionStore::new(Duration::from_secs(60))),
    );

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            let body = new_user_json("a@x.com", "alice", "secret123");
            send(&app, request(Method::POST, "/v1/users", None, Some(&body))).await.0
        }));
    }

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::CREATED => created += 1,
            status => assert_eq!(status, StatusCode::BAD_REQUEST),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(users.len(), 1);
}
