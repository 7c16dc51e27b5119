use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Deployment environment. Production hides internal error details from
/// API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
///
/// Field mapping overrides (`FIELD_MAP_*`) are read separately by
/// `FieldMapping::from_env`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub scoring_service_url: String,
    pub port: u16,
    pub rust_log: String,
    pub environment: Environment,
    pub db_max_connections: u32,
    pub storage_timeout: Duration,
    pub scoring_timeout: Duration,
    pub scoring_max_attempts: u32,
    pub scoring_retry_base: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Vars(lookup);

        Ok(Config {
            database_url: env.require("DATABASE_URL")?,
            scoring_service_url: env.require("SCORING_SERVICE_URL")?,
            port: env.parse_or("PORT", 8080)?,
            rust_log: env.get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            environment: env
                .get("APP_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or(Environment::Development),
            db_max_connections: env.parse_or("DB_MAX_CONNECTIONS", 10)?,
            storage_timeout: Duration::from_millis(env.parse_or("STORAGE_TIMEOUT_MS", 5_000)?),
            scoring_timeout: Duration::from_millis(env.parse_or("SCORING_TIMEOUT_MS", 30_000)?),
            scoring_max_attempts: env.parse_or("SCORING_MAX_ATTEMPTS", 2)?,
            scoring_retry_base: Duration::from_millis(env.parse_or("SCORING_RETRY_BASE_MS", 2_000)?),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
            None => Ok(default),
        }
    }
}
