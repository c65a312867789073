use crate::error::{Result, SessionError};
use crate::utils::get_env_with_prefix;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Redis session store configuration
///
/// Secrets (`password`, `secret`) are never serialized and are redacted from
/// debug output.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisSessionConfig {
    /// Redis host name or address
    #[serde(default = "default_host")]
    pub host: String,

    /// Redis port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Redis logical database index
    ///
    /// Useful to keep session data apart from other data on the same server.
    #[serde(default)]
    pub db: i64,

    /// Redis AUTH password
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,

    /// Namespace prepended to every key as `{key_prefix}:{session_id}`
    #[serde(default)]
    pub key_prefix: String,

    /// Default session expiry in seconds, used when a save doesn't pass one
    ///
    /// `None` stores sessions without expiry.
    #[serde(default)]
    pub expire_after: Option<u64>,

    /// Cookie-signing secret, handed back to the host framework unchanged
    ///
    /// The store itself never reads it.
    #[serde(default, skip_serializing)]
    pub secret: Option<SecretString>,

    /// Timeout for establishing the Redis connection (milliseconds)
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,

    /// Timeout for each Redis command (milliseconds)
    #[serde(default)]
    pub response_timeout_ms: Option<u64>,
}

impl Default for RedisSessionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db: 0,
            password: None,
            key_prefix: String::new(),
            expire_after: None,
            secret: None,
            connect_timeout_ms: None,
            response_timeout_ms: None,
        }
    }
}

impl RedisSessionConfig {
    pub fn builder() -> RedisSessionConfigBuilder {
        RedisSessionConfigBuilder::new()
    }

    /// Load session store configuration from environment variables
    ///
    /// Each variable is read with a `TIDEWAY_` prefix first, then without.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(host) = get_env_with_prefix("SESSION_REDIS_HOST") {
            config.host = host;
        }

        if let Some(port) = parse_env("SESSION_REDIS_PORT") {
            config.port = port;
        }

        if let Some(db) = parse_env("SESSION_REDIS_DB") {
            config.db = db;
        }

        if let Some(password) = get_env_with_prefix("SESSION_REDIS_PASSWORD") {
            config.password = Some(password.into());
        }

        if let Some(prefix) = get_env_with_prefix("SESSION_KEY_PREFIX") {
            config.key_prefix = prefix;
        }

        if let Some(seconds) = parse_env("SESSION_EXPIRE_AFTER") {
            config.expire_after = Some(seconds);
        }

        if let Some(secret) = get_env_with_prefix("SESSION_SECRET") {
            config.secret = Some(secret.into());
        }

        if let Some(ms) = parse_env("SESSION_REDIS_CONNECT_TIMEOUT_MS") {
            config.connect_timeout_ms = Some(ms);
        }

        if let Some(ms) = parse_env("SESSION_REDIS_RESPONSE_TIMEOUT_MS") {
            config.response_timeout_ms = Some(ms);
        }

        config
    }

    /// Check the configuration, failing on the first invalid option
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(SessionError::configuration("host must not be empty"));
        }

        if self.port == 0 {
            return Err(SessionError::configuration("port must be non-zero"));
        }

        if self.db < 0 {
            return Err(SessionError::configuration(
                "db must be a non-negative database index",
            ));
        }

        if self.expire_after == Some(0) {
            return Err(SessionError::configuration(
                "expire_after must be a positive number of seconds",
            ));
        }

        if self.connect_timeout_ms == Some(0) || self.response_timeout_ms == Some(0) {
            return Err(SessionError::configuration(
                "connection timeouts must be positive",
            ));
        }

        Ok(())
    }

    /// Default expiry as a Duration
    pub fn default_expiry(&self) -> Option<Duration> {
        self.expire_after.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
}

/// Builder for RedisSessionConfig
#[must_use = "builder does nothing until you call build()"]
pub struct RedisSessionConfigBuilder {
    config: RedisSessionConfig,
}

impl RedisSessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RedisSessionConfig::default(),
        }
    }

    /// Start from environment variables instead of defaults
    pub fn from_env(mut self) -> Self {
        self.config = RedisSessionConfig::from_env();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn with_db(mut self, db: i64) -> Self {
        self.config.db = db;
        self
    }

    pub fn with_password(mut self, password: impl Into<SecretString>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    pub fn with_expire_after(mut self, seconds: u64) -> Self {
        self.config.expire_after = Some(seconds);
        self
    }

    pub fn with_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.config.secret = Some(secret.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = Some(millis_rounded_up(timeout));
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout_ms = Some(millis_rounded_up(timeout));
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<RedisSessionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for RedisSessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole milliseconds, rounding any fraction up so a non-zero timeout stays non-zero
fn millis_rounded_up(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = get_env_with_prefix(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = key, value = %raw, "Ignoring unparsable session config value");
            None
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6379
}
