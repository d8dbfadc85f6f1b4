// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const SESSION_BEGUN: &str = "session.begun";
pub const SESSION_ENDED: &str = "session.ended";
pub const SESSION_EVICTED: &str = "session.evicted";
pub const SIGN_IN_FAILED: &str = "sign_in.failed";
pub const SIGN_IN_LOCKED: &str = "sign_in.locked";
pub const USER_REGISTERED: &str = "user.registered";
pub const USER_STORE_DIVERGED: &str = "user.store_diverged";
