// ================
// crates/common/src/lib.rs
// ================
//! Wire models shared between the gateway and its clients.
//!
//! Every type here serializes with camelCase field names. The derived
//! credential on [`User`] is never written out, so a `User` can be
//! returned to a client or cached in session state without leaking it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned user identifier
pub type UserId = i64;

/// A registered account
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// PHC-formatted password hash
    #[serde(skip_serializing, default)]
    pub pass_hash: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("user_name", &self.user_name)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Registration payload
#[derive(Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("user_name", &self.user_name)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Sign-in payload
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Profile changes a user may apply to their own account.
///
/// Unknown fields are rejected so a client cannot smuggle in `email`,
/// `userName` or `id`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Updates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Updates {
    /// True when neither field is present
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none()
    }
}

impl User {
    /// Apply profile changes in place. Identity fields are untouched.
    pub fn apply_updates(&mut self, updates: &Updates) {
        if let Some(first) = &updates.first_name {
            self.first_name = first.clone();
        }
        if let Some(last) = &updates.last_name {
            self.last_name = last.clone();
        }
    }
}
