//! Service configuration
//!
//! Loaded from a TOML file, then overridden from the environment so that
//! secrets never have to live in the file.

use crate::error::ConfigError;
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`TokenConfig::secret`]
pub const ENV_TOKEN_SECRET: &str = "SAFELINE_TOKEN_SECRET";
/// Environment variable overriding [`GeocodingConfig::api_key`]
pub const ENV_MAPS_KEY: &str = "GOOGLE_MAPS_API_KEY";
/// Environment variable overriding [`SmsConfig::api_key`]
pub const ENV_SMS_KEY: &str = "NEXMO_API_KEY";
/// Environment variable overriding [`SmsConfig::api_secret`]
pub const ENV_SMS_SECRET: &str = "NEXMO_API_SECRET";
/// Environment variable overriding [`HttpConfig::listen_addr`]
pub const ENV_LISTEN_ADDR: &str = "SAFELINE_LISTEN_ADDR";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP listener and session table
    pub http: HttpConfig,
    /// Video access tokens
    pub token: TokenConfig,
    /// SMS provider
    pub sms: SmsConfig,
    /// Reverse geocoding provider
    pub geocoding: GeocodingConfig,
    /// Directory holding recorded videos
    pub video_dir: PathBuf,
    /// Registered app users
    pub users: Vec<UserRecord>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            token: TokenConfig::default(),
            sms: SmsConfig::default(),
            geocoding: GeocodingConfig::default(),
            video_dir: PathBuf::from("videos"),
            users: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// - `ConfigError::Parse` if the text is not a valid configuration
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from an optional file, then apply environment overrides
    ///
    /// # Errors
    /// - `ConfigError::Io` / `ConfigError::Parse` for an unreadable file
    /// - `ConfigError::Invalid` if the result fails [`ServiceConfig::validate`]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from a variable lookup (the process environment in production)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(ENV_TOKEN_SECRET) {
            self.token.secret = Some(secret);
        }
        if let Some(key) = lookup(ENV_MAPS_KEY) {
            self.geocoding.api_key = Some(key);
        }
        if let Some(key) = lookup(ENV_SMS_KEY) {
            self.sms.api_key = Some(key);
        }
        if let Some(secret) = lookup(ENV_SMS_SECRET) {
            self.sms.api_secret = Some(secret);
        }
        if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
            self.http.listen_addr = addr;
        }
    }

    /// Reject configurations the service cannot run with
    ///
    /// # Errors
    /// - `ConfigError::Invalid` describing the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.ttl_secs == 0 {
            return Err(ConfigError::Invalid("token.ttl_secs must be positive".to_string()));
        }
        if matches!(self.token.secret.as_deref(), Some("")) {
            return Err(ConfigError::Invalid("token.secret must not be empty".to_string()));
        }
        if let Some(user) = self.users.iter().find(|u| u.id.as_str().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "user '{}' has an empty id",
                user.full_name
            )));
        }
        Ok(())
    }

    /// With token settings
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: TokenConfig) -> Self {
        self.token = token;
        self
    }

    /// With video directory
    #[inline]
    #[must_use]
    pub fn with_video_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.video_dir = dir.into();
        self
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Socket address to bind
    pub listen_addr: String,
    /// Bearer credential -> user id
    pub sessions: BTreeMap<String, UserId>,
    /// Largest accepted JSON body in bytes
    pub max_body_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            sessions: BTreeMap::new(),
            max_body_bytes: 16 * 1024,
        }
    }
}

/// Video access token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Signing secret; an ephemeral key is generated when absent
    pub secret: Option<String>,
    /// Token lifetime in seconds
    pub ttl_secs: u64,
}

impl TokenConfig {
    /// Token lifetime
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_secs: 300,
        }
    }
}

/// SMS provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Alphanumeric sender or virtual number; the reporter's phone is used when unset
    pub sender_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://rest.nexmo.com/sms/json".to_string(),
            api_key: None,
            api_secret: None,
            sender_id: None,
            timeout_secs: 10,
        }
    }
}

/// Reverse geocoding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

/// A registered user entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub full_name: String,
    pub phone: String,
}
