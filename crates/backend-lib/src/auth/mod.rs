// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod rate_limit;
pub mod session;
pub mod signed_token;
pub mod token_generator;

pub use password::{hash_password, hash_password_secure, verify_password, HashCost};
pub use rate_limit::SignInLimiter;
pub use session::{BegunSession, SessionError, SessionId, SessionManager, SessionState, TokenCarrier};
pub use signed_token::{KeyError, SigningKey, TokenError};
