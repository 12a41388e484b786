use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_PATH: &str = "data/sentiments.db";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_path: PathBuf,
    pub page_size: u32,
    pub model: ModelSettings,
}

/// Connection details for the hosted sentiment model.
#[derive(Clone, Debug)]
pub struct ModelSettings {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let port = parse_or(value("PORT"), "PORT", DEFAULT_PORT)?;
        let page_size = parse_or(
            value("HISTORY_PAGE_SIZE"),
            "HISTORY_PAGE_SIZE",
            DEFAULT_PAGE_SIZE,
        )?
        .clamp(1, MAX_PAGE_SIZE);
        let timeout_secs = parse_or(
            value("SENTIMENT_MODEL_TIMEOUT_SECS"),
            "SENTIMENT_MODEL_TIMEOUT_SECS",
            DEFAULT_MODEL_TIMEOUT_SECS,
        )?;

        Ok(Self {
            port,
            database_path: value("HISTORY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            page_size,
            model: ModelSettings {
                endpoint: value("SENTIMENT_MODEL_URL"),
                token: value("SENTIMENT_MODEL_TOKEN"),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a valid number, got {raw:?}")),
        None => Ok(default),
    }
}
