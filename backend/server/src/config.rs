use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use axum::http::HeaderValue;
use ledger::sessions::{DEFAULT_RESET_TTL, DEFAULT_SESSION_TTL};
use thiserror::Error;
use tracing::{debug, info, warn};

const DEFAULT_PORT: u16 = 1111;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Redis,
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Backend::Redis),
            "memory" => Ok(Backend::Memory),
            other => Err(format!("unknown backend {other:?}, expected redis or memory")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: Backend,
    pub redis_url: String,
    pub session_ttl: Duration,
    pub reset_ttl: Duration,
    pub cors_origin: HeaderValue,
    pub cookie_secure: bool,
}

/// In-process defaults: memory backend, nothing read from the environment.
impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backend: Backend::Memory,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            session_ttl: DEFAULT_SESSION_TTL,
            reset_ttl: DEFAULT_RESET_TTL,
            cors_origin: HeaderValue::from_static(DEFAULT_CORS_ORIGIN),
            cookie_secure: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let redis_url: String = try_load("REDIS_URL", DEFAULT_REDIS_URL)?;
        let redis_url = match read_secret("REDIS_PASSWORD") {
            Some(password) => with_password(&redis_url, &password),
            None => redis_url,
        };

        let cors_origin: String = try_load("CORS_ORIGIN", DEFAULT_CORS_ORIGIN)?;
        let cors_origin = HeaderValue::from_str(&cors_origin).map_err(|e| ConfigError::Invalid {
            key: "CORS_ORIGIN",
            reason: e.to_string(),
        })?;

        Ok(Self {
            port: try_load("RUST_PORT", &DEFAULT_PORT.to_string())?,
            backend: try_load("STORE_BACKEND", "redis")?,
            redis_url,
            session_ttl: Duration::from_secs(try_load(
                "SESSION_TTL_SECS",
                &DEFAULT_SESSION_TTL.as_secs().to_string(),
            )?),
            reset_ttl: Duration::from_secs(try_load(
                "RESET_TTL_SECS",
                &DEFAULT_RESET_TTL.as_secs().to_string(),
            )?),
            cors_origin,
            cookie_secure: try_load("COOKIE_SECURE", "false")?,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            debug!("No {secret_name} secret: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}

/// Splices a password into a `redis://host` style url that carries no credentials yet.
fn with_password(url: &str, password: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) if !rest.contains('@') => format!("{scheme}://:{password}@{rest}"),
        _ => {
            warn!("REDIS_URL already carries credentials, ignoring REDIS_PASSWORD");
            url.to_string()
        }
    }
}
