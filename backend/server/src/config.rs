use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
#[error("Invalid {key} value: {reason}")]
pub struct ConfigError {
    key: &'static str,
    reason: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    /// Serve this catalog fixture from memory instead of Redis.
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let redis_url: String = try_load("REDIS_URL", "redis://redis:6379")?;

        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            redis_url: match read_secret("REDIS_PASSWORD") {
                Some(password) => with_password(&redis_url, &password),
                None => redis_url,
            },
            catalog_path: env::var_os("CATALOG_PATH").map(PathBuf::from),
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");

            ConfigError {
                key,
                reason: e.to_string(),
            }
        })
}

/// Docker secret, absent outside of a swarm.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("No {secret_name} secret loaded: {e}");
        })
        .ok()
}

/// Password goes into the userinfo part, percent-encoded.
fn with_password(redis_url: &str, password: &str) -> String {
    match redis_url.split_once("://") {
        Some((scheme, rest)) if !rest.contains('@') => {
            format!("{scheme}://:{}@{rest}", urlencoding::encode(password))
        }
        _ => redis_url.to_string(),
    }
}
