use std::env;
use std::time::Duration;

use crate::shared::AppError;

pub const DEFAULT_REGION: &str = "BR1";
pub const DEFAULT_SEASON: &str = "2024";
pub const DEFAULT_USER_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const MAX_USER_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (host:port)
    pub bind_address: String,

    /// Postgres connection URL; in-memory stores are used when absent
    pub database_url: Option<String>,

    pub db_max_connections: u32,

    /// Expiration applied to cached user lookups
    pub user_cache_ttl: Duration,

    pub default_region: String,
    pub default_season: String,

    /// Origin allowed by the CORS layer
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            database_url: None,
            db_max_connections: 10,
            user_cache_ttl: DEFAULT_USER_CACHE_TTL,
            default_region: DEFAULT_REGION.to_string(),
            default_season: DEFAULT_SEASON.to_string(),
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                AppError::Config(format!("DB_MAX_CONNECTIONS must be a number, got {raw:?}"))
            })?,
            None => defaults.db_max_connections,
        };

        let user_cache_ttl = match get("USER_CACHE_TTL_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    AppError::Config(format!("USER_CACHE_TTL_SECS must be a number, got {raw:?}"))
                })?;
                let ttl = Duration::from_secs(secs);
                if ttl > MAX_USER_CACHE_TTL {
                    return Err(AppError::Config(format!(
                        "USER_CACHE_TTL_SECS must be at most {}, got {secs}",
                        MAX_USER_CACHE_TTL.as_secs()
                    )));
                }
                ttl
            }
            None => defaults.user_cache_ttl,
        };

        Ok(Self {
            bind_address: get("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            database_url: get("DATABASE_URL"),
            db_max_connections,
            user_cache_ttl,
            default_region: get("DEFAULT_REGION").unwrap_or(defaults.default_region),
            default_season: get("DEFAULT_SEASON").unwrap_or(defaults.default_season),
            cors_origin: get("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert!(config.database_url.is_none());
        assert_eq!(config.user_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.default_region, "BR1");
        assert_eq!(config.default_season, "2024");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/wardscore"),
            ("USER_CACHE_TTL_SECS", "30"),
            ("DEFAULT_REGION", "NA1"),
            ("DB_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/wardscore")
        );
        assert_eq!(config.user_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.default_region, "NA1");
        assert_eq!(config.db_max_connections, 4);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[("DEFAULT_REGION", "  ")])).unwrap();
        assert_eq!(config.default_region, "BR1");
    }

    #[test]
    fn test_malformed_number_is_config_error() {
        let result = Config::from_lookup(lookup_from(&[("USER_CACHE_TTL_SECS", "soon")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_cache_ttl_above_a_week_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[(
            "USER_CACHE_TTL_SECS",
            "18446744073709551615",
        )]));
        assert!(matches!(result, Err(AppError::Config(_))));

        let config =
            Config::from_lookup(lookup_from(&[("USER_CACHE_TTL_SECS", "604800")])).unwrap();
        assert_eq!(config.user_cache_ttl, MAX_USER_CACHE_TTL);
    }
}
