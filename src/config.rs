//! Runtime settings read from the environment (after `.env` is loaded).

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_TTL;

/// MODIS C6.1 active fires for Canada, last seven days.
pub const DEFAULT_FIRMS_URL: &str =
    "https://firms.modaps.eosdis.nasa.gov/data/active_fire/modis-c6.1/csv/MODIS_C6_1_Canada_7d.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub feed_url: String,
    pub cache_ttl: Duration,
    pub fetch_retries: u32,
    pub fetch_backoff: Duration,
    pub fetch_timeout: Duration,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            feed_url: DEFAULT_FIRMS_URL.to_string(),
            cache_ttl: DEFAULT_TTL,
            fetch_retries: 1,
            fetch_backoff: Duration::from_millis(500),
            fetch_timeout: Duration::from_secs(30),
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    /// Reads `FIRMS_URL`, `CACHE_TTL_SECS`, `FETCH_RETRIES`, `FETCH_BACKOFF_MS`,
    /// `FETCH_TIMEOUT_SECS` and `BIND_ADDR`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Config::default();
        Ok(Config {
            feed_url: lookup("FIRMS_URL").unwrap_or(d.feed_url),
            cache_ttl: parse_or(&lookup, "CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(d.cache_ttl),
            fetch_retries: parse_or(&lookup, "FETCH_RETRIES")?.unwrap_or(d.fetch_retries),
            fetch_backoff: parse_or(&lookup, "FETCH_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(d.fetch_backoff),
            fetch_timeout: parse_or(&lookup, "FETCH_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(d.fetch_timeout),
            bind_addr: lookup("BIND_ADDR").unwrap_or(d.bind_addr),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(name)
        .map(|v| v.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("invalid value for {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(c, Config::default());
        assert_eq!(c.cache_ttl, Duration::from_secs(3600));
        assert_eq!(c.fetch_retries, 1);
    }

    #[test]
    fn test_overrides() {
        let c = Config::from_lookup(lookup(&[
            ("FIRMS_URL", "data/fires.csv"),
            ("CACHE_TTL_SECS", "60"),
            ("FETCH_RETRIES", "3"),
            ("BIND_ADDR", "127.0.0.1:9000"),
        ]))
        .unwrap();

        assert_eq!(c.feed_url, "data/fires.csv");
        assert_eq!(c.cache_ttl, Duration::from_secs(60));
        assert_eq!(c.fetch_retries, 3);
        assert_eq!(c.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = Config::from_lookup(lookup(&[("CACHE_TTL_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("CACHE_TTL_SECS"));
    }
}
