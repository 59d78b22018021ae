//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use stockroom_observability::LogFormat;

const DEV_USERNAME: &str = "admin";
const DEV_PASSWORD: &str = "admin";
const DEV_SESSION_SECRET: &str = "dev-session-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub auth_username: String,
    pub auth_password: String,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub log_format: LogFormat,
    /// Names of security-relevant variables that fell back to dev defaults.
    pub dev_defaults: Vec<&'static str>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut dev_defaults = Vec::new();

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|e| invalid("BIND_ADDR", e))?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(0) => return Err(invalid("DATABASE_MAX_CONNECTIONS", "must be at least 1")),
                Ok(n) => n,
                Err(e) => return Err(invalid("DATABASE_MAX_CONNECTIONS", e)),
            },
            None => 5,
        };

        let session_ttl_minutes = match get("SESSION_TTL_MINUTES") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) if n > 0 => n,
                Ok(_) => return Err(invalid("SESSION_TTL_MINUTES", "must be positive")),
                Err(e) => return Err(invalid("SESSION_TTL_MINUTES", e)),
            },
            None => 720,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|e: String| invalid("LOG_FORMAT", e))?,
            None => LogFormat::default(),
        };

        let mut or_dev_default = |key: &'static str, default: &str| {
            get(key).unwrap_or_else(|| {
                dev_defaults.push(key);
                default.to_string()
            })
        };
        let auth_username = or_dev_default("AUTH_USERNAME", DEV_USERNAME);
        let auth_password = or_dev_default("AUTH_PASSWORD", DEV_PASSWORD);
        let session_secret = or_dev_default("SESSION_SECRET", DEV_SESSION_SECRET);

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            auth_username,
            auth_password,
            session_secret,
            session_ttl: Duration::minutes(session_ttl_minutes),
            log_format,
            dev_defaults,
        })
    }

    /// Emit startup warnings. Call after tracing is initialized.
    pub fn warn_on_dev_defaults(&self) {
        for var in &self.dev_defaults {
            tracing::warn!(var = *var, "not set; using insecure dev default");
        }
    }
}

fn invalid(var: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.to_string(),
    }
}
