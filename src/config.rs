//! Process settings loaded from the environment (`.env` is honoured by `main`)

use std::time::Duration;

use crate::api::coingecko::CoinGeckoClient;
use crate::scheduler::PollerConfig;
use crate::utils::{TrackerError, TrackerResult};

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub db_max_connections: u32,
    pub poll_interval: Duration,
    pub max_concurrent: usize,
    pub fetch_timeout: Option<Duration>,
    pub coingecko_api_key: Option<String>,
    pub coingecko_base_url: String,
    pub vs_currency: String,
    /// Symbols tracked at startup
    pub tracked_coins: Vec<String>,
}

impl Settings {
    pub fn from_env() -> TrackerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup
    pub fn from_lookup<F>(lookup: F) -> TrackerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| get(key).ok_or_else(|| TrackerError::Config(format!("{} not set", key)));

        let database_url = require("DATABASE_URL")?;

        let poll_secs = parse_positive("POLL_INTERVAL_SECS", &require("POLL_INTERVAL_SECS")?)?;
        let max_concurrent = parse_positive("MAX_CONCURRENT", &require("MAX_CONCURRENT")?)?;
        let max_concurrent = usize::try_from(max_concurrent)
            .map_err(|_| TrackerError::Config(format!("MAX_CONCURRENT is too large: {}", max_concurrent)))?;

        let fetch_timeout = match get("FETCH_TIMEOUT_SECS") {
            Some(v) => Some(Duration::from_secs(parse_positive("FETCH_TIMEOUT_SECS", &v)?)),
            None => None,
        };

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => {
                let parsed = parse_positive("DB_MAX_CONNECTIONS", &v)?;
                u32::try_from(parsed).map_err(|_| {
                    TrackerError::Config(format!("DB_MAX_CONNECTIONS must be at most {}, got {}", u32::MAX, parsed))
                })?
            }
            None => 5,
        };

        let tracked_coins = get("TRACKED_COINS")
            .map(|list| {
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            db_max_connections,
            poll_interval: Duration::from_secs(poll_secs),
            max_concurrent,
            fetch_timeout,
            coingecko_api_key: get("COINGECKO_API_KEY"),
            coingecko_base_url: get("COINGECKO_BASE_URL")
                .unwrap_or_else(|| CoinGeckoClient::DEFAULT_BASE_URL.to_string()),
            vs_currency: get("VS_CURRENCY").unwrap_or_else(|| "usd".to_string()),
            tracked_coins,
        })
    }

    pub fn poller_config(&self) -> TrackerResult<PollerConfig> {
        Ok(PollerConfig::new(self.poll_interval, self.max_concurrent)?.with_fetch_timeout(self.fetch_timeout))
    }
}

/// Parse a strictly positive integer; zero, negatives and junk are rejected
fn parse_positive(key: &str, value: &str) -> TrackerResult<u64> {
    let parsed: i64 = value
        .parse()
        .map_err(|_| TrackerError::Config(format!("{} must be an integer, got {:?}", key, value)))?;

    if parsed <= 0 {
        return Err(TrackerError::Config(format!("{} must be greater than zero, got {}", key, parsed)));
    }

    Ok(parsed as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> TrackerResult<Settings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    const BASE: [(&str, &str); 3] = [
        ("DATABASE_URL", "sqlite://prices.db"),
        ("POLL_INTERVAL_SECS", "60"),
        ("MAX_CONCURRENT", "4"),
    ];

    #[test]
    fn test_minimal_settings_use_defaults() {
        let s = settings(&BASE).unwrap();
        assert_eq!(s.poll_interval, Duration::from_secs(60));
        assert_eq!(s.max_concurrent, 4);
        assert_eq!(s.db_max_connections, 5);
        assert_eq!(s.fetch_timeout, None);
        assert_eq!(s.vs_currency, "usd");
        assert_eq!(s.coingecko_base_url, CoinGeckoClient::DEFAULT_BASE_URL);
        assert!(s.coingecko_api_key.is_none());
        assert!(s.tracked_coins.is_empty());
    }

    #[test]
    fn test_optional_settings_are_read() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("FETCH_TIMEOUT_SECS", "5"),
            ("COINGECKO_API_KEY", "demo-key"),
            ("VS_CURRENCY", "eur"),
            ("TRACKED_COINS", "btc, eth,,sol "),
        ]);
        let s = settings(&pairs).unwrap();
        assert_eq!(s.fetch_timeout, Some(Duration::from_secs(5)));
        assert_eq!(s.coingecko_api_key.as_deref(), Some("demo-key"));
        assert_eq!(s.vs_currency, "eur");
        assert_eq!(s.tracked_coins, vec!["btc", "eth", "sol"]);
    }

    #[test]
    fn test_max_concurrent_must_be_positive() {
        for bad in ["0", "-2", "many", ""] {
            let mut pairs = BASE.to_vec();
            pairs[2] = ("MAX_CONCURRENT", bad);
            assert!(
                matches!(settings(&pairs), Err(TrackerError::Config(_))),
                "MAX_CONCURRENT={:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_db_max_connections_out_of_range() {
        let mut pairs = BASE.to_vec();
        pairs.push(("DB_MAX_CONNECTIONS", "4294967296"));
        assert!(matches!(settings(&pairs), Err(TrackerError::Config(msg)) if msg.contains("DB_MAX_CONNECTIONS")));

        let mut pairs = BASE.to_vec();
        pairs.push(("DB_MAX_CONNECTIONS", "12"));
        assert_eq!(settings(&pairs).unwrap().db_max_connections, 12);
    }

    #[test]
    fn test_required_keys() {
        assert!(matches!(settings(&BASE[1..]), Err(TrackerError::Config(msg)) if msg.contains("DATABASE_URL")));
        assert!(matches!(settings(&BASE[..2]), Err(TrackerError::Config(msg)) if msg.contains("MAX_CONCURRENT")));
    }

    #[test]
    fn test_poller_config_carries_timeout() {
        let mut pairs = BASE.to_vec();
        pairs.push(("FETCH_TIMEOUT_SECS", "3"));
        let config = settings(&pairs).unwrap().poller_config().unwrap();
        assert_eq!(config.max_concurrent(), 4);
        assert_eq!(config.fetch_timeout(), Some(Duration::from_secs(3)));
    }
}
