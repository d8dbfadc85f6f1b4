// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::rate_limit::MAX_LOCKOUT_DURATION;
use crate::auth::{HashCost, SigningKey};
use crate::storage::MAX_SESSION_TTL;

/// Default configuration file
pub const CONFIG_FILE: &str = "gateway.toml";

/// Prefix for environment overrides, nested keys split on `__`
pub const ENV_PREFIX: &str = "GATEWAY_";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Secret used to sign session tokens
    pub signing_key: String,
    /// Session TTL in seconds
    pub session_ttl_secs: u64,
    /// How often expired sessions are purged
    pub reaper_interval_secs: u64,
    /// Token transport
    pub carrier: CarrierSettings,
    /// Password requirements
    pub password: PasswordRequirements,
    /// scrypt cost
    pub hash_cost: HashCost,
    /// Failed sign-in throttling
    pub sign_in: SignInSettings,
}

/// Token transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CarrierSettings {
    Bearer,
    Cookie {
        cookie_name: String,
        #[serde(default = "default_true")]
        cookie_secure: bool,
    },
}

fn default_true() -> bool {
    true
}

/// Password requirements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordRequirements {
    /// Minimum password length
    pub min_length: usize,
}

/// Failed sign-in throttling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInSettings {
    /// Failures before lockout
    pub max_attempts: u32,
    /// Lockout length in seconds
    pub lockout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            log_level: "info".to_string(),
            log_json: false,
            signing_key: String::new(),
            session_ttl_secs: 60 * 60 * 24 * 7, // 7 days
            reaper_interval_secs: 60 * 60,
            carrier: CarrierSettings::Bearer,
            password: PasswordRequirements::default(),
            hash_cost: HashCost::default(),
            sign_in: SignInSettings::default(),
        }
    }
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self { min_length: 6 }
    }
}

impl Default for SignInSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_secs: 5 * 60,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("signing_key", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("reaper_interval_secs", &self.reaper_interval_secs)
            .field("carrier", &self.carrier)
            .field("password", &self.password)
            .field("hash_cost", &self.hash_cost)
            .field("sign_in", &self.sign_in)
            .finish()
    }
}

impl Settings {
    /// Load from defaults, `gateway.toml` and `GATEWAY_*` env vars
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load from defaults, the given TOML file and `GATEWAY_*` env vars
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings for values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.signing_key.len() < SigningKey::MIN_KEY_LENGTH {
            bail!(
                "signing_key must be at least {} bytes",
                SigningKey::MIN_KEY_LENGTH
            );
        }
        if self.session_ttl_secs == 0 {
            bail!("session_ttl_secs must be greater than zero");
        }
        if self.session_ttl_secs > MAX_SESSION_TTL.as_secs() {
            bail!("session_ttl_secs cannot exceed {}", MAX_SESSION_TTL.as_secs());
        }
        if self.reaper_interval_secs == 0 {
            bail!("reaper_interval_secs must be greater than zero");
        }
        if self.reaper_interval_secs > MAX_SESSION_TTL.as_secs() {
            bail!("reaper_interval_secs cannot exceed {}", MAX_SESSION_TTL.as_secs());
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("unknown log_level {:?}", self.log_level);
        }
        if self.password.min_length < 6 {
            bail!("password.min_length must be at least 6");
        }
        if self.sign_in.max_attempts == 0 {
            bail!("sign_in.max_attempts must be greater than zero");
        }
        if self.sign_in.lockout_secs > MAX_LOCKOUT_DURATION.as_secs() {
            bail!("sign_in.lockout_secs cannot exceed {}", MAX_LOCKOUT_DURATION.as_secs());
        }
        if let CarrierSettings::Cookie { cookie_name, .. } = &self.carrier {
            if cookie_name.is_empty() || cookie_name.contains([';', '=', ' ']) {
                bail!("carrier.cookie_name {cookie_name:?} is not a valid cookie name");
            }
        }
        self.hash_cost.params()?;
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }

    pub fn lockout_duration(&self) -> Duration {
        Duration::from_secs(self.sign_in.lockout_secs)
    }
}
