// ============================
// crates/backend-lib/src/auth/signed_token.rs
// ============================
//! Signed session tokens.
//!
//! A token is `<identifier>.<signature>` where the signature is the
//! URL-safe base64 of HMAC-SHA256(signing key, identifier). The identifier
//! stays readable by the client; the signature only proves it was issued
//! by a holder of the signing key.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Separator between identifier and signature
pub const SEPARATOR: char = '.';

/// Tokens longer than this are rejected before any MAC work
pub const MAX_TOKEN_LENGTH: usize = 2048;

/// Errors produced when building a signing key
#[derive(Debug, Clone, Error)]
pub enum KeyError {
    #[error("signing key too short: got {actual} bytes, need at least {minimum}")]
    TooShort { actual: usize, minimum: usize },
}

/// Errors produced when verifying a token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
}

/// Process-wide MAC key, keyed once at startup.
#[derive(Clone)]
pub struct SigningKey {
    mac: HmacSha256,
}

impl SigningKey {
    /// Minimum allowed key length in bytes
    pub const MIN_KEY_LENGTH: usize = 32;

    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, KeyError> {
        let key = key.as_ref();
        let too_short = || KeyError::TooShort {
            actual: key.len(),
            minimum: Self::MIN_KEY_LENGTH,
        };
        if key.len() < Self::MIN_KEY_LENGTH {
            return Err(too_short());
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|_| too_short())?;
        Ok(Self { mac })
    }

    /// Sign an identifier, returning the composite token
    pub fn sign(&self, identifier: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(identifier.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{identifier}{SEPARATOR}{signature}")
    }

    /// Verify a token and return the identifier it carries
    pub fn verify<'t>(&self, token: &'t str) -> Result<&'t str, TokenError> {
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(TokenError::Malformed);
        }

        let mut parts = token.split(SEPARATOR);
        let (identifier, signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(sig), None) if !id.is_empty() && !sig.is_empty() => (id, sig),
            _ => return Err(TokenError::Malformed),
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let mut mac = self.mac.clone();
        mac.update(identifier.as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        Ok(identifier)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey").finish_non_exhaustive()
    }
}
