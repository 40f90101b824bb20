//! Configuration loading and representation.
//!
//! Everything is read once at process start. Any error here is fatal: the
//! process must not start serving with a missing secret or a broken role table.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use thiserror::Error;

use tenantguard_auth::{RoleRuleTable, RoleTableError};

/// Minimum accepted length of the HS256 signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("ACCESS_TOKEN_SECRET is too short ({len} bytes, need at least {min})", min = MIN_SECRET_LEN)]
    SecretTooShort { len: usize },

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("failed to read role table {path}: {source}")]
    RoleTableIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    RoleTable(#[from] RoleTableError),
}

/// HS256 signing secret. Never printed.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::Missing("ACCESS_TOKEN_SECRET"));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort { len: secret.len() });
        }
        Ok(Self(secret))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Credential and authorization settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub signing_secret: SigningSecret,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Upper bound for every refresh-credential store call and directory lookup.
    pub query_timeout: StdDuration,
    pub role_rules: Arc<RoleRuleTable>,
}

impl AuthConfig {
    /// Config with default TTLs, timeout and the built-in role table.
    pub fn with_secret(signing_secret: SigningSecret) -> Self {
        Self {
            signing_secret,
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl: Duration::days(DEFAULT_REFRESH_TTL_DAYS),
            query_timeout: StdDuration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
            role_rules: Arc::new(RoleRuleTable::builtin()),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("ACCESS_TOKEN_SECRET").ok_or(ConfigError::Missing("ACCESS_TOKEN_SECRET"))?;
        let signing_secret = SigningSecret::new(secret.into_bytes())?;

        let access_ttl_secs: i64 = parse_or(&lookup, "ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_ttl_days: i64 = parse_or(&lookup, "REFRESH_TOKEN_TTL_DAYS", DEFAULT_REFRESH_TTL_DAYS)?;
        let query_timeout_ms: u64 = parse_or(&lookup, "STORE_QUERY_TIMEOUT_MS", DEFAULT_QUERY_TIMEOUT_MS)?;

        if access_ttl_secs <= 0 {
            return Err(invalid("ACCESS_TOKEN_TTL_SECS", "must be positive"));
        }
        if refresh_ttl_days <= 0 {
            return Err(invalid("REFRESH_TOKEN_TTL_DAYS", "must be positive"));
        }
        if query_timeout_ms == 0 {
            return Err(invalid("STORE_QUERY_TIMEOUT_MS", "must be positive"));
        }

        let access_ttl = Duration::seconds(access_ttl_secs);
        let refresh_ttl = Duration::days(refresh_ttl_days);
        if refresh_ttl <= access_ttl {
            return Err(invalid(
                "REFRESH_TOKEN_TTL_DAYS",
                "refresh credentials must outlive access credentials",
            ));
        }

        let role_rules = match lookup("ROLE_RULES_PATH") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::RoleTableIo { path, source })?;
                RoleRuleTable::from_toml_str(&raw)?
            }
            None => RoleRuleTable::builtin(),
        };

        Ok(Self {
            signing_secret,
            access_ttl,
            refresh_ttl,
            query_timeout: StdDuration::from_millis(query_timeout_ms),
            role_rules: Arc::new(role_rules),
        })
    }
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,

    /// Postgres URL for the refresh-credential table; in-memory when unset.
    pub database_url: Option<String>,

    /// Server bind address (host:port).
    pub bind_address: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            auth: AuthConfig::from_lookup(&lookup)?,
            database_url: lookup("DATABASE_URL"),
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(var, e.to_string())),
        None => Ok(default),
    }
}

fn invalid(var: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.into(),
    }
}
