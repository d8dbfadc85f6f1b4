// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
//! Session identifier generation
//!
//! Identifiers are drawn from the thread-local CSPRNG and encoded as URL-safe
//! base64, so they never contain the signed token separator.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Default identifier size in bytes (32 bytes = 256 bits of entropy)
const DEFAULT_ID_BYTES: usize = 32;

/** Generate a fresh session identifier
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_session_id() -> String {
    generate_secure_token_with_size(DEFAULT_ID_BYTES)
}

/** Generate a cryptographically secure random token with specified size
# Arguments
* `bytes` - The size of the random token in bytes */
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
