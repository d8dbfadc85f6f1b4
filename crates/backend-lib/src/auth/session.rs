// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session lifecycle: begin, read, update and end sessions.
//!
//! A session moves `NonExistent -> Active -> Ended`. The manager binds the
//! signing key to the session store and moves tokens through the
//! configured [`TokenCarrier`].
use std::fmt;
use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};
use gateway_common::User;
use metrics::counter;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use super::signed_token::SigningKey;
use super::token_generator::generate_session_id;
use crate::config::CarrierSettings;
use crate::metrics::{SESSION_BEGUN, SESSION_ENDED};
use crate::storage::{SessionStore, StoreError};

/// Opaque identifier keying one session in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State kept for each authenticated session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub begin_time: DateTime<Utc>,
    /// Snapshot of the user taken at sign-in, refreshed on profile updates
    pub user: User,
}

impl SessionState {
    pub fn new(user: User) -> Self {
        Self {
            begin_time: Utc::now(),
            user,
        }
    }
}

/// Session lifecycle failures
#[derive(Error, Debug)]
pub enum SessionError {
    /// Carrier missing or malformed, bad signature, or no stored session.
    /// The reason is for logs only.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("session store write failed: {0}")]
    StoreWrite(String),

    #[error("session state encoding failed: {0}")]
    State(#[from] serde_json::Error),
}

/// How the signed token travels between client and server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCarrier {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// HttpOnly cookie with the given name
    Cookie { name: String, secure: bool },
}

const BEARER_PREFIX: &str = "Bearer ";

impl TokenCarrier {
    /// Pull the raw token out of request headers
    pub fn extract(&self, headers: &HeaderMap) -> Option<String> {
        match self {
            TokenCarrier::Bearer => headers
                .get(header::AUTHORIZATION)?
                .to_str()
                .ok()?
                .strip_prefix(BEARER_PREFIX)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            TokenCarrier::Cookie { name, .. } => headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(';'))
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.to_string())
                .filter(|t| !t.is_empty()),
        }
    }

    /// Attach a token to response headers
    pub fn attach(&self, headers: &mut HeaderMap, token: &str) -> Result<(), SessionError> {
        let invalid = |_| SessionError::Unauthenticated("token not header-safe".to_string());
        match self {
            TokenCarrier::Bearer => {
                let value = HeaderValue::from_str(&format!("{BEARER_PREFIX}{token}")).map_err(invalid)?;
                headers.insert(header::AUTHORIZATION, value);
            },
            TokenCarrier::Cookie { name, secure } => {
                let secure = if *secure { "; Secure" } else { "" };
                let value = HeaderValue::from_str(&format!(
                    "{name}={token}; Path=/; HttpOnly; SameSite=Strict{secure}"
                ))
                .map_err(invalid)?;
                headers.append(header::SET_COOKIE, value);
            },
        }
        Ok(())
    }

    /// Tell the client to forget its token
    pub fn clear(&self, headers: &mut HeaderMap) {
        if let TokenCarrier::Cookie { name, secure } = self {
            let secure = if *secure { "; Secure" } else { "" };
            if let Ok(value) = HeaderValue::from_str(&format!(
                "{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict{secure}"
            )) {
                headers.append(header::SET_COOKIE, value);
            }
        }
    }
}

impl From<&CarrierSettings> for TokenCarrier {
    fn from(settings: &CarrierSettings) -> Self {
        match settings {
            CarrierSettings::Bearer => TokenCarrier::Bearer,
            CarrierSettings::Cookie { cookie_name, cookie_secure } => TokenCarrier::Cookie {
                name: cookie_name.clone(),
                secure: *cookie_secure,
            },
        }
    }
}

/// A freshly begun session
#[derive(Debug, Clone)]
pub struct BegunSession {
    pub id: SessionId,
    pub token: String,
}

/// Binds the signing key, session store and carrier together
#[derive(Clone)]
pub struct SessionManager {
    signing_key: SigningKey,
    store: Arc<dyn SessionStore>,
    carrier: TokenCarrier,
}

impl SessionManager {
    pub fn new(signing_key: SigningKey, store: Arc<dyn SessionStore>, carrier: TokenCarrier) -> Self {
        Self {
            signing_key,
            store,
            carrier,
        }
    }

    pub fn carrier(&self) -> &TokenCarrier {
        &self.carrier
    }

    /// Store `state` under a fresh identifier and return the signed token.
    /// Nothing is issued if the store write fails.
    pub async fn begin_session<T: Serialize>(&self, state: &T) -> Result<BegunSession, SessionError> {
        let id = SessionId(generate_session_id());
        let json = serde_json::to_string(state)?;

        self.store
            .save(id.as_str(), json)
            .await
            .map_err(|e| SessionError::StoreWrite(e.to_string()))?;

        let token = self.signing_key.sign(id.as_str());
        counter!(SESSION_BEGUN).increment(1);
        tracing::debug!("session begun");

        Ok(BegunSession { id, token })
    }

    /// Begin a session and attach its token to `headers`
    pub async fn begin_session_into<T: Serialize>(
        &self,
        state: &T,
        headers: &mut HeaderMap,
    ) -> Result<SessionId, SessionError> {
        let begun = self.begin_session(state).await?;
        self.carrier.attach(headers, &begun.token)?;
        Ok(begun.id)
    }

    /// Verify a raw token and return its identifier
    pub fn session_id(&self, token: &str) -> Result<SessionId, SessionError> {
        self.signing_key
            .verify(token)
            .map(|id| SessionId(id.to_string()))
            .map_err(|e| SessionError::Unauthenticated(e.to_string()))
    }

    fn session_id_from(&self, headers: &HeaderMap) -> Result<SessionId, SessionError> {
        let token = self
            .carrier
            .extract(headers)
            .ok_or_else(|| SessionError::Unauthenticated("no session token".to_string()))?;
        self.session_id(&token)
    }

    /// Resolve the request's session and load its state
    pub async fn get_state<T: DeserializeOwned>(
        &self,
        headers: &HeaderMap,
    ) -> Result<(SessionId, T), SessionError> {
        let id = self.session_id_from(headers)?;
        let json = self.store.get(id.as_str()).await.map_err(|e| match e {
            StoreError::NotFound => SessionError::Unauthenticated("session not in store".to_string()),
            other => {
                tracing::error!(error = %other, "session store read failed");
                SessionError::Unauthenticated("session store unavailable".to_string())
            },
        })?;
        let state = serde_json::from_str(&json)?;
        Ok((id, state))
    }

    /// Overwrite the state stored for an existing session
    pub async fn save_state<T: Serialize>(&self, id: &SessionId, state: &T) -> Result<(), SessionError> {
        let json = serde_json::to_string(state)?;
        self.store
            .save(id.as_str(), json)
            .await
            .map_err(|e| SessionError::StoreWrite(e.to_string()))
    }

    /// Verify the request's session, delete it and clear the client's
    /// carrier. Ending a session that is already gone fails.
    pub async fn end_session(
        &self,
        headers: &HeaderMap,
        response_headers: &mut HeaderMap,
    ) -> Result<SessionId, SessionError> {
        let id = self.session_id_from(headers)?;
        self.store.delete(id.as_str()).await.map_err(|e| match e {
            StoreError::NotFound => SessionError::Unauthenticated("session not in store".to_string()),
            other => SessionError::StoreWrite(other.to_string()),
        })?;
        self.carrier.clear(response_headers);
        counter!(SESSION_ENDED).increment(1);
        tracing::debug!("session ended");
        Ok(id)
    }
}
