// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Authenticated-session gateway: accounts, sign-in, signed session
//! tokens, self-service profile updates and sign-out.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{hash_password, SessionManager, SignInLimiter, SigningKey, TokenCarrier};
use crate::config::Settings;
use crate::storage::{SessionStore, UserStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// User persistence
    pub users: Arc<dyn UserStore>,
    /// Session lifecycle
    pub sessions: SessionManager,
    /// Failed sign-in throttling
    pub sign_in_limiter: SignInLimiter,
    /// Settings the state was built from
    pub settings: Arc<Settings>,
    /// Verified against when a sign-in email matches no account
    pub(crate) decoy_hash: Arc<str>,
}

const DECOY_PASSWORD: &str = "decoy-password-never-issued";

impl AppState {
    /// Build the state. The signing key is taken from `settings` once here
    /// and handed to the session manager.
    pub fn new(
        settings: Settings,
        users: Arc<dyn UserStore>,
        session_store: Arc<dyn SessionStore>,
    ) -> anyhow::Result<Self> {
        settings.validate()?;

        let signing_key = SigningKey::new(settings.signing_key.as_bytes())?;
        let sessions = SessionManager::new(
            signing_key,
            session_store,
            TokenCarrier::from(&settings.carrier),
        );
        let sign_in_limiter =
            SignInLimiter::new(settings.sign_in.max_attempts, settings.lockout_duration());
        let decoy_hash = Arc::from(hash_password(DECOY_PASSWORD, &settings.hash_cost)?);

        Ok(Self {
            users,
            sessions,
            sign_in_limiter,
            settings: Arc::new(settings),
            decoy_hash,
        })
    }
}
