use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

/// Which of the two HTTP surfaces this process serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppMode {
    Content,
    Stats,
}

impl FromStr for AppMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "content" => Ok(Self::Content),
            "stats" => Ok(Self::Stats),
            other => Err(anyhow!("unknown APP_MODE: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub app_mode: AppMode,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub paseto_key: [u8; 32],
    pub content_token_ttl_hours: u64,
    pub stats_token_ttl_hours: u64,
    pub password_iterations: u32,
    pub cors_allowed_origins: Vec<String>,
    pub media_root: String,
}

/// One year. Larger values would overflow when converted to an expiry.
pub const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365;

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        validate_http_addr(&http_addr)?;

        let password_iterations: u32 = env_or_parse("PASSWORD_ITERATIONS", "600000")?;
        if password_iterations == 0 {
            return Err(anyhow!("invalid PASSWORD_ITERATIONS: must be positive"));
        }

        Ok(Self {
            http_addr,
            app_mode: env_or_parse("APP_MODE", "content")?,
            database_url: env_or_err("DATABASE_URL")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            paseto_key: env_key_32("PASETO_KEY")?,
            content_token_ttl_hours: token_ttl_hours("CONTENT_TOKEN_TTL_HOURS")?,
            stats_token_ttl_hours: token_ttl_hours("STATS_TOKEN_TTL_HOURS")?,
            password_iterations,
            cors_allowed_origins: parse_origins(&env_or(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:3000,http://localhost:3001",
            )),
            media_root: env_or("MEDIA_ROOT", "media"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    decode_key_32(key, &value)
}

fn decode_key_32(key: &str, value: &str) -> Result<[u8; 32]> {
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}

fn token_ttl_hours(key: &str) -> Result<u64> {
    let hours: u64 = env_or_parse(key, "24")?;
    check_token_ttl(key, hours)
}

fn check_token_ttl(key: &str, hours: u64) -> Result<u64> {
    if hours == 0 || hours > MAX_TOKEN_TTL_HOURS {
        return Err(anyhow!(
            "invalid {}: must be between 1 and {}",
            key,
            MAX_TOKEN_TTL_HOURS
        ));
    }
    Ok(hours)
}

fn validate_http_addr(value: &str) -> Result<()> {
    SocketAddr::from_str(value).map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;
    Ok(())
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
