use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub geocoding_base_url: String,
    pub geocoding_search_path: String,
    pub sun_api_base_url: String,
    pub sun_api_path: String,
    pub cache_ttl_seconds: i64,
    pub max_range_days: u32,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub use_mock_upstream: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Every field has a
    /// default; only malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let cache_ttl_seconds: i64 = parse_or(&lookup, "CACHE_TTL_SECONDS", 3600)?;
        if chrono::Duration::try_seconds(cache_ttl_seconds).is_none() {
            return Err(anyhow::anyhow!(
                "CACHE_TTL_SECONDS {} is out of range",
                cache_ttl_seconds
            ));
        }

        Ok(Config {
            bind_addr: string("BIND_ADDR", "0.0.0.0:4567"),
            geocoding_base_url: string("GEOCODING_BASE_URL", "https://nominatim.openstreetmap.org"),
            geocoding_search_path: string("GEOCODING_SEARCH_PATH", "/search"),
            sun_api_base_url: string("SUN_API_BASE_URL", "https://api.sunrise-sunset.org"),
            sun_api_path: string("SUN_API_PATH", "/json"),
            cache_ttl_seconds,
            max_range_days: parse_or(&lookup, "MAX_RANGE_DAYS", 31)?,
            http_timeout_secs: parse_or(&lookup, "HTTP_TIMEOUT_SECS", 30)?,
            http_user_agent: string("HTTP_USER_AGENT", "SunAggregator/1.0"),
            use_mock_upstream: parse_or(&lookup, "USE_MOCK_UPSTREAM", false)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:4567");
        assert_eq!(config.cache_ttl_seconds, 3600);
        assert_eq!(config.max_range_days, 31);
        assert_eq!(config.sun_api_path, "/json");
        assert!(!config.use_mock_upstream);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CACHE_TTL_SECONDS", "-5"),
            ("USE_MOCK_UPSTREAM", "true"),
            ("GEOCODING_BASE_URL", "http://localhost:9000"),
        ])
        .unwrap();
        assert_eq!(config.cache_ttl_seconds, -5);
        assert!(config.use_mock_upstream);
        assert_eq!(config.geocoding_base_url, "http://localhost:9000");
    }

    #[test]
    fn test_out_of_range_ttl_is_rejected() {
        let err = config_from(&[("CACHE_TTL_SECONDS", "9223372036854775807")]).unwrap_err();
        assert!(err.to_string().contains("CACHE_TTL_SECONDS"));

        let err = config_from(&[("CACHE_TTL_SECONDS", "-9223372036854775807")]).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let err = config_from(&[("MAX_RANGE_DAYS", "a week")]).unwrap_err();
        assert!(err.to_string().contains("MAX_RANGE_DAYS"));
    }
}
