// ================================
// tests/unit/signed_token_tests.rs
// ================================
//! Unit tests for the signed token codec
use gateway_lib::auth::signed_token::MAX_TOKEN_LENGTH;
use gateway_lib::auth::token_generator::generate_session_id;
use gateway_lib::auth::{KeyError, SigningKey, TokenError};

const KEY: &str = "test-signing-key-0123456789abcdef";

#[test]
fn test_round_trip_with_generated_id() {
    let key = SigningKey::new(KEY).unwrap();
    let id = generate_session_id();
    let token = key.sign(&id);
    assert_eq!(key.verify(&token), Ok(id.as_str()));
}

#[test]
fn test_signing_is_deterministic() {
    let key = SigningKey::new(KEY).unwrap();
    assert_eq!(key.sign("abc"), key.sign("abc"));
    assert_ne!(key.sign("abc"), key.sign("abd"));
}

#[test]
fn test_other_key_rejects() {
    let issuer = SigningKey::new(KEY).unwrap();
    let other = SigningKey::new("another-signing-key-0123456789abc").unwrap();
    let token = issuer.sign("abc");
    assert_eq!(other.verify(&token), Err(TokenError::InvalidSignature));
}

#[test]
fn test_swapped_signature_rejected() {
    let key = SigningKey::new(KEY).unwrap();
    let a = key.sign("first");
    let b = key.sign("second");
    let (_, sig_b) = b.split_once('.').unwrap();
    let forged = format!("first.{sig_b}");
    assert_eq!(key.verify(&forged), Err(TokenError::InvalidSignature));
    assert!(key.verify(&a).is_ok());
}

#[test]
fn test_malformed_shapes() {
    let key = SigningKey::new(KEY).unwrap();
    for token in ["", ".", "abc", "abc.", ".sig", "a.b.c"] {
        assert_eq!(key.verify(token), Err(TokenError::Malformed), "{token:?}");
    }
    let oversized = format!("{}.sig", "a".repeat(MAX_TOKEN_LENGTH));
    assert_eq!(key.verify(&oversized), Err(TokenError::Malformed));
}

#[test]
fn test_short_key_rejected() {
    let err = SigningKey::new("short").unwrap_err();
    assert!(matches!(err, KeyError::TooShort { actual: 5, .. }));
}

#[test]
fn test_debug_hides_key() {
    let key = SigningKey::new(KEY).unwrap();
    assert!(!format!("{key:?}").contains("test-signing-key"));
}
