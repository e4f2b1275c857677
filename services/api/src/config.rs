//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chefito_core::QuotaLimits;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Per-IP request budgets enforced by the rate-limiting middleware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimits {
    /// Requests allowed per client IP every 15 minutes, across all routes.
    pub general_per_15_min: u32,
    /// Record-view requests allowed per client IP every minute.
    pub views_per_minute: u32,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub frontend_url: String,
    pub quota_limits: QuotaLimits,
    pub rate_limits: RateLimits,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3001".parse::<SocketAddr>())?;
        let database_url = required(&lookup, "DATABASE_URL")?;
        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", Ok(5))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Supabase Auth ---
        let supabase_url = required(&lookup, "SUPABASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let supabase_service_key = required(&lookup, "SUPABASE_SERVICE_ROLE_KEY")?;

        let frontend_url =
            lookup("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Quota and Rate Limits ---
        let defaults = QuotaLimits::default();
        let quota_limits = QuotaLimits {
            free: parse_or(&lookup, "FREE_WEEKLY_LIMIT", Ok(defaults.free))?,
            premium: parse_or(&lookup, "PREMIUM_WEEKLY_LIMIT", Ok(defaults.premium))?,
        };
        if quota_limits.free == 0 {
            return Err(ConfigError::InvalidValue(
                "FREE_WEEKLY_LIMIT".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if quota_limits.premium < quota_limits.free {
            return Err(ConfigError::InvalidValue(
                "PREMIUM_WEEKLY_LIMIT".to_string(),
                format!("must be at least FREE_WEEKLY_LIMIT ({})", quota_limits.free),
            ));
        }

        let rate_limits = RateLimits {
            general_per_15_min: parse_nonzero(&lookup, "GENERAL_RATE_LIMIT", 100)?,
            views_per_minute: parse_nonzero(&lookup, "VIEW_RATE_LIMIT", 30)?,
        };

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            supabase_url,
            supabase_service_key,
            frontend_url,
            quota_limits,
            rate_limits,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: Result<T, T::Err>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = match lookup(key) {
        Some(raw) => raw.trim().parse::<T>(),
        None => default,
    };
    parsed.map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn parse_nonzero<F>(lookup: &F, key: &str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, Ok(default))?;
    if value == 0 {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
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

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/chefito"),
        ("SUPABASE_URL", "https://project.supabase.co/"),
        ("SUPABASE_SERVICE_ROLE_KEY", "service-key"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:3001".parse().unwrap());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.supabase_url, "https://project.supabase.co");
        assert_eq!(config.quota_limits, QuotaLimits { free: 2, premium: 50 });
        assert_eq!(config.rate_limits.general_per_15_min, 100);
        assert_eq!(config.rate_limits.views_per_minute, 30);
        assert_eq!(config.database_max_connections, 5);
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn quota_limits_can_be_overridden() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("FREE_WEEKLY_LIMIT", "3"));
        pairs.push(("PREMIUM_WEEKLY_LIMIT", "10"));

        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.quota_limits, QuotaLimits { free: 3, premium: 10 });
    }

    #[test]
    fn premium_limit_below_free_limit_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("FREE_WEEKLY_LIMIT", "5"));
        pairs.push(("PREMIUM_WEEKLY_LIMIT", "4"));

        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "PREMIUM_WEEKLY_LIMIT"));
    }

    #[test]
    fn garbage_values_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BIND_ADDRESS", "not-an-address"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("VIEW_RATE_LIMIT", "0"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RUST_LOG", "chatty"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
