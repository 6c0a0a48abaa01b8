//! Configuration loading from environment.

use std::env;
use std::time::Duration;

use anyhow::Context;
use wallet_repo::RemoteConfig;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/wallet.db?mode=rwc";
const DEFAULT_NAVASAN_URL: &str = "http://api.navasan.tech/latest/";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub navasan_api_key: Option<String>,
    pub navasan_base_url: String,
    pub rates_ttl: Duration,
    pub upstream_timeout: Duration,
    /// Set only when both the URL and the key are present.
    pub remote: Option<RemoteConfig>,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(port) => port.parse().context("PORT must be a port number")?,
            None => 3000,
        };

        let rates_ttl = seconds(var("RATES_CACHE_TTL_SECS"), 60)
            .context("RATES_CACHE_TTL_SECS must be a whole number of seconds")?;
        let upstream_timeout = seconds(var("UPSTREAM_TIMEOUT_SECS"), 10)
            .context("UPSTREAM_TIMEOUT_SECS must be a whole number of seconds")?;

        let remote = match (var("SUPABASE_URL"), var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(api_key)) => Some(RemoteConfig { url, api_key }),
            _ => None,
        };

        let log_format = match var("LOG_FORMAT") {
            Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            port,
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            navasan_api_key: var("NAVASAN_API_KEY"),
            navasan_base_url: var("NAVASAN_BASE_URL")
                .unwrap_or_else(|| DEFAULT_NAVASAN_URL.to_string()),
            rates_ttl,
            upstream_timeout,
            remote,
            log_format,
        })
    }
}

fn seconds(value: Option<String>, default: u64) -> anyhow::Result<Duration> {
    let secs = match value {
        Some(v) => v.trim().parse()?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}
