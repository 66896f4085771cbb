use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::TimeDelta;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreBackend::MongoDb),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown STORE_BACKEND '{}', expected mongodb or memory", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// `development` exposes internal error detail in 500 responses.
    pub development: bool,

    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_database: String,

    /// Take the client IP from Forwarded / X-Forwarded-For instead of the socket.
    pub trust_proxy: bool,

    /// Minimum spacing between two counted visits from one IP.
    pub visit_cooldown: TimeDelta,
    pub rate_limit_window: TimeDelta,
    /// Requests allowed per IP per window on the record endpoint. 0 disables.
    pub rate_limit_max: u32,
    pub visitor_active_window: TimeDelta,
    /// Keep only this many most recent entries in a visitor's history.
    pub visit_history_limit: Option<usize>,
    pub store_timeout: Duration,

    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Load configuration from the process environment (after `dotenv`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let visit_history_limit = match var("VISIT_HISTORY_LIMIT") {
            Some(raw) => {
                let limit = raw
                    .trim()
                    .parse::<usize>()
                    .context("VISIT_HISTORY_LIMIT must be a positive integer")?;
                if limit == 0 {
                    bail!("VISIT_HISTORY_LIMIT must be at least 1");
                }
                Some(limit)
            }
            None => None,
        };

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/').to_owned())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".into()),
            port: parse_or(var("PORT"), 3001, "PORT must be a valid port number")?,
            development: var("APP_ENV")
                .map(|env| env.trim().eq_ignore_ascii_case("development"))
                .unwrap_or(false),
            store_backend: match var("STORE_BACKEND") {
                Some(raw) => raw.parse()?,
                None => StoreBackend::MongoDb,
            },
            mongodb_uri: var("MONGODB_URI").unwrap_or_else(|| "mongodb://127.0.0.1:27017".into()),
            mongodb_database: var("MONGODB_DATABASE").unwrap_or_else(|| "Autograph".into()),
            trust_proxy: parse_or(var("TRUST_PROXY"), false, "TRUST_PROXY must be true or false")?,
            visit_cooldown: TimeDelta::seconds(parse_or(
                var("VISIT_COOLDOWN_SECS"),
                60,
                "VISIT_COOLDOWN_SECS must be a whole number of seconds",
            )?),
            rate_limit_window: TimeDelta::seconds(parse_or(
                var("RATE_LIMIT_WINDOW_SECS"),
                300,
                "RATE_LIMIT_WINDOW_SECS must be a whole number of seconds",
            )?),
            rate_limit_max: parse_or(
                var("RATE_LIMIT_MAX"),
                30,
                "RATE_LIMIT_MAX must be a non-negative integer",
            )?,
            visitor_active_window: TimeDelta::minutes(parse_or(
                var("VISITOR_ACTIVE_MINUTES"),
                30,
                "VISITOR_ACTIVE_MINUTES must be a whole number of minutes",
            )?),
            visit_history_limit,
            store_timeout: Duration::from_secs(parse_or(
                var("STORE_TIMEOUT_SECS"),
                10,
                "STORE_TIMEOUT_SECS must be a whole number of seconds",
            )?),
            cors_origins,
        })
    }
}

fn parse_or<T>(raw: Option<String>, default: T, message: &'static str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value.trim().parse::<T>().context(message),
        None => Ok(default),
    }
}
