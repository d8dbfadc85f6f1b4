// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Store contracts consumed by the authentication core, with in-memory
//! implementations.
//!
//! Every method returns an explicit `Result`; "not found" is always
//! `Err(StoreError::NotFound)`, never an empty success.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use gateway_common::{Updates, User, UserId};
use metrics::counter;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::metrics::SESSION_EVICTED;

/// Longest session lifetime the in-memory store will honour
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Failures reported by store implementations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("read failed: {0}")]
    Read(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. The store assigns the ID and enforces email and
    /// user-name uniqueness, failing with `Conflict`.
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn get_by_user_name(&self, user_name: &str) -> Result<User, StoreError>;

    async fn get_by_id(&self, id: UserId) -> Result<User, StoreError>;

    /// Apply profile changes and return the updated user
    async fn update(&self, id: UserId, updates: &Updates) -> Result<User, StoreError>;
}

/// Session persistence: identifier to serialized state
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, id: &str, state: String) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<String, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

#[derive(Default)]
struct UserTable {
    next_id: UserId,
    by_id: BTreeMap<UserId, User>,
    by_email: HashMap<String, UserId>,
    by_user_name: HashMap<String, UserId>,
}

/// In-memory user store
#[derive(Clone, Default)]
pub struct MemUserStore {
    table: Arc<RwLock<UserTable>>,
}

impl MemUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub fn len(&self) -> usize {
        self.table.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for MemUserStore {
    async fn insert(&self, mut user: User) -> Result<User, StoreError> {
        let mut table = self.table.write();

        if table.by_email.contains_key(&user.email) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        if table.by_user_name.contains_key(&user.user_name) {
            return Err(StoreError::Conflict("user name already taken".to_string()));
        }

        table.next_id += 1;
        user.id = table.next_id;
        table.by_email.insert(user.email.clone(), user.id);
        table.by_user_name.insert(user.user_name.clone(), user.id);
        table.by_id.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let table = self.table.read();
        table
            .by_email
            .get(email)
            .and_then(|id| table.by_id.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_user_name(&self, user_name: &str) -> Result<User, StoreError> {
        let table = self.table.read();
        table
            .by_user_name
            .get(user_name)
            .and_then(|id| table.by_id.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.table
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, id: UserId, updates: &Updates) -> Result<User, StoreError> {
        let mut table = self.table.write();
        let user = table.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.apply_updates(updates);
        Ok(user.clone())
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    state: String,
    expires_at: Instant,
}

/// In-memory session store with sliding expiry
#[derive(Clone)]
pub struct MemSessionStore {
    entries: Arc<DashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl MemSessionStore {
    /// `ttl` is capped at [`MAX_SESSION_TTL`]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl: ttl.min(MAX_SESSION_TTL),
        }
    }

    /// Number of stored sessions, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            counter!(SESSION_EVICTED).increment(removed as u64);
        }
        removed
    }

    /// Spawn a task that purges expired sessions every `interval`
    pub fn spawn_reaper(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "evicted expired sessions");
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for MemSessionStore {
    async fn save(&self, id: &str, state: String) -> Result<(), StoreError> {
        self.entries.insert(
            id.to_string(),
            SessionEntry {
                state,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<String, StoreError> {
        let now = Instant::now();
        if let Some(mut entry) = self.entries.get_mut(id) {
            if now < entry.expires_at {
                entry.expires_at = now + self.ttl;
                return Ok(entry.state.clone());
            }
        }
        // expired or absent; the guard above is dropped before removal
        self.entries.remove_if(id, |_, entry| entry.expires_at <= now);
        Err(StoreError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self.entries.remove(id) {
            Some((_, entry)) if Instant::now() < entry.expires_at => Ok(()),
            _ => Err(StoreError::NotFound),
        }
    }
}
