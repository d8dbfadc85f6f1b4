// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Throttling of repeated failed sign-ins.
//!
//! Attempts are keyed by normalized email whether or not an account
//! exists for it, so the limiter's behaviour reveals nothing about which
//! emails are registered.

use dashmap::DashMap;
use metrics::counter;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::SIGN_IN_LOCKED;

/// Default number of failed attempts before lockout
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout duration (5 minutes)
const DEFAULT_LOCKOUT_DURATION: Duration = Duration::from_secs(5 * 60);

/// Longest lockout the limiter will impose
pub const MAX_LOCKOUT_DURATION: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// Failures older than this are forgotten
const ATTEMPT_MEMORY: Duration = Duration::from_secs(24 * 60 * 60);

/// Entry in the attempt map
#[derive(Debug, Clone)]
struct AttemptEntry {
    failed_attempts: u32,
    last_failure: Instant,
    lockout_expiry: Option<Instant>,
}

/// Failed sign-in tracker
#[derive(Debug, Clone)]
pub struct SignInLimiter {
    attempts: Arc<DashMap<String, AttemptEntry>>,
    max_attempts: u32,
    lockout_duration: Duration,
}

impl Default for SignInLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCKOUT_DURATION)
    }
}

impl SignInLimiter {
    /// `lockout_duration` is capped at [`MAX_LOCKOUT_DURATION`]
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration: lockout_duration.min(MAX_LOCKOUT_DURATION),
        }
    }

    /// Record a failed sign-in for `email`
    pub fn record_failure(&self, email: &str) {
        let now = Instant::now();

        let mut entry = self
            .attempts
            .entry(email.to_string())
            .or_insert_with(|| AttemptEntry {
                failed_attempts: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        // an expired lockout starts a fresh count
        if entry.lockout_expiry.is_some_and(|expiry| now >= expiry) {
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.lockout_expiry.is_none() {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            counter!(SIGN_IN_LOCKED).increment(1);
            tracing::warn!(
                attempts = entry.failed_attempts,
                lockout_secs = self.lockout_duration.as_secs(),
                "sign-in locked after repeated failures"
            );
        }
    }

    /// Forget failures after a successful sign-in
    pub fn record_success(&self, email: &str) {
        self.attempts.remove(email);
    }

    /// Whether `email` may attempt a sign-in now
    pub fn check(&self, email: &str) -> bool {
        match self.attempts.get(email) {
            Some(entry) => !entry.lockout_expiry.is_some_and(|expiry| Instant::now() < expiry),
            None => true,
        }
    }

    /// Drop expired lockouts and stale failure counts
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts.retain(|_, entry| match entry.lockout_expiry {
            Some(expiry) => now < expiry,
            None => now.duration_since(entry.last_failure) < ATTEMPT_MEMORY,
        });
    }
}
