//! Configuration loading for Adssimsim services
//!
//! All configuration is read from environment variables with the
//! `ADSSIMSIM_` prefix, with defaults for everything except the database
//! URL. A `.env` file is honored when present.
//!
//! # Example
//!
//! ```no_run
//! use adssimsim_core::config::{load_dotenv, ConfigLoader, DatabaseConfig, FeedConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! load_dotenv();
//!
//! let db_config = DatabaseConfig::from_env()?;
//! let feed_config = FeedConfig::from_env()?;
//!
//! db_config.validate()?;
//! feed_config.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::AdssimsimError;
use std::time::Duration;
use url::Url;

/// One loadable section of service configuration
pub trait ConfigLoader: Sized {
    /// Read the section from `ADSSIMSIM_`-prefixed environment variables,
    /// filling defaults for anything optional that is unset.
    ///
    /// Fails with a `ConfigurationError` naming the offending key when a
    /// required variable is absent or a value does not parse.
    fn from_env() -> Result<Self, AdssimsimError>;

    /// Check the loaded values for internal consistency
    fn validate(&self) -> Result<(), AdssimsimError>;
}

/// PostgreSQL connection and pool settings
///
/// - `ADSSIMSIM_DATABASE_URL` (required, falls back to `DATABASE_URL`): PostgreSQL connection URL
/// - `ADSSIMSIM_DATABASE_MAX_CONNECTIONS` (optional): Maximum pool connections (default: 20)
/// - `ADSSIMSIM_DATABASE_MIN_CONNECTIONS` (optional): Minimum pool connections (default: 2)
/// - `ADSSIMSIM_DATABASE_CONNECT_TIMEOUT` (optional): Connection timeout in seconds (default: 30)
/// - `ADSSIMSIM_DATABASE_IDLE_TIMEOUT` (optional): Idle connection timeout in seconds (default: 600)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL for the Postgres instance
    pub url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// Connections the pool keeps warm
    pub min_connections: u32,
    /// How long to wait for a connection before giving up
    pub connect_timeout: Duration,
    /// How long an unused connection may sit before being closed
    pub idle_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/adssimsim".to_string(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl ConfigLoader for DatabaseConfig {
    fn from_env() -> Result<Self, AdssimsimError> {
        let url = std::env::var("ADSSIMSIM_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| {
                AdssimsimError::configuration(
                    "DATABASE_URL or ADSSIMSIM_DATABASE_URL must be set",
                    "ADSSIMSIM_DATABASE_URL",
                )
            })?;

        let defaults = DatabaseConfig::default();
        Ok(Self {
            url,
            max_connections: parse_env_var(
                "ADSSIMSIM_DATABASE_MAX_CONNECTIONS",
                defaults.max_connections,
            )?,
            min_connections: parse_env_var(
                "ADSSIMSIM_DATABASE_MIN_CONNECTIONS",
                defaults.min_connections,
            )?,
            connect_timeout: Duration::from_secs(parse_env_var(
                "ADSSIMSIM_DATABASE_CONNECT_TIMEOUT",
                defaults.connect_timeout.as_secs(),
            )?),
            idle_timeout: Duration::from_secs(parse_env_var(
                "ADSSIMSIM_DATABASE_IDLE_TIMEOUT",
                defaults.idle_timeout.as_secs(),
            )?),
        })
    }

    fn validate(&self) -> Result<(), AdssimsimError> {
        Url::parse(&self.url).map_err(|e| {
            AdssimsimError::configuration(
                format!("database URL does not parse: {}", e),
                "ADSSIMSIM_DATABASE_URL",
            )
        })?;

        if self.max_connections == 0 {
            return Err(AdssimsimError::configuration(
                "max_connections must be at least 1",
                "ADSSIMSIM_DATABASE_MAX_CONNECTIONS",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(AdssimsimError::configuration(
                format!(
                    "min_connections ({}) exceeds max_connections ({})",
                    self.min_connections, self.max_connections
                ),
                "ADSSIMSIM_DATABASE_MIN_CONNECTIONS",
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(AdssimsimError::configuration(
                "connect_timeout must be at least 1 second",
                "ADSSIMSIM_DATABASE_CONNECT_TIMEOUT",
            ));
        }
        if self.idle_timeout.is_zero() {
            return Err(AdssimsimError::configuration(
                "idle_timeout must be at least 1 second",
                "ADSSIMSIM_DATABASE_IDLE_TIMEOUT",
            ));
        }

        Ok(())
    }
}

/// Feed configuration
///
/// Page sizes and fallback polling cadence for campaign feeds.
///
/// # Environment Variables
///
/// - `ADSSIMSIM_FEED_PAGE_SIZE` (optional): Viewer feed page size (default: 10)
/// - `ADSSIMSIM_FEED_DASHBOARD_PAGE_SIZE` (optional): Advertiser dashboard page size (default: 8)
/// - `ADSSIMSIM_FEED_POLL_INTERVAL` (optional): Poll fallback interval in seconds (default: 15)
/// - `ADSSIMSIM_FEED_HISTORY_LIMIT` (optional): Watch history page cap (default: 50)
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Page size for viewer feed listings
    pub page_size: u32,
    /// Page size for advertiser dashboard listings
    pub dashboard_page_size: u32,
    /// Interval between poll-fallback resyncs
    pub poll_interval: Duration,
    /// Maximum rows returned by a watch history listing
    pub history_limit: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            dashboard_page_size: 8,
            poll_interval: Duration::from_secs(15),
            history_limit: 50,
        }
    }
}

impl ConfigLoader for FeedConfig {
    fn from_env() -> Result<Self, AdssimsimError> {
        let defaults = FeedConfig::default();
        Ok(Self {
            page_size: parse_env_var("ADSSIMSIM_FEED_PAGE_SIZE", defaults.page_size)?,
            dashboard_page_size: parse_env_var(
                "ADSSIMSIM_FEED_DASHBOARD_PAGE_SIZE",
                defaults.dashboard_page_size,
            )?,
            poll_interval: Duration::from_secs(parse_env_var(
                "ADSSIMSIM_FEED_POLL_INTERVAL",
                defaults.poll_interval.as_secs(),
            )?),
            history_limit: parse_env_var("ADSSIMSIM_FEED_HISTORY_LIMIT", defaults.history_limit)?,
        })
    }

    fn validate(&self) -> Result<(), AdssimsimError> {
        if self.page_size == 0 {
            return Err(AdssimsimError::configuration(
                "page_size must be at least 1",
                "ADSSIMSIM_FEED_PAGE_SIZE",
            ));
        }
        if self.dashboard_page_size == 0 {
            return Err(AdssimsimError::configuration(
                "dashboard_page_size must be at least 1",
                "ADSSIMSIM_FEED_DASHBOARD_PAGE_SIZE",
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(AdssimsimError::configuration(
                "poll_interval must be at least 1 second",
                "ADSSIMSIM_FEED_POLL_INTERVAL",
            ));
        }
        if self.history_limit == 0 {
            return Err(AdssimsimError::configuration(
                "history_limit must be at least 1",
                "ADSSIMSIM_FEED_HISTORY_LIMIT",
            ));
        }

        Ok(())
    }
}

/// Rewards configuration
///
/// # Environment Variables
///
/// - `ADSSIMSIM_REWARDS_INITIAL_CREDIT` (optional): Credit granted to a new advertiser (default: 500)
#[derive(Debug, Clone)]
pub struct RewardsConfig {
    /// Credit balance granted once to a profile that has never held credit
    pub initial_credit: i64,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            initial_credit: 500,
        }
    }
}

impl ConfigLoader for RewardsConfig {
    fn from_env() -> Result<Self, AdssimsimError> {
        let initial_credit = parse_env_var(
            "ADSSIMSIM_REWARDS_INITIAL_CREDIT",
            RewardsConfig::default().initial_credit,
        )?;

        Ok(Self { initial_credit })
    }

    fn validate(&self) -> Result<(), AdssimsimError> {
        if self.initial_credit < 0 {
            return Err(AdssimsimError::configuration(
                "initial_credit cannot be negative",
                "ADSSIMSIM_REWARDS_INITIAL_CREDIT",
            ));
        }

        Ok(())
    }
}

/// Read `key` from the environment, falling back to `default` when unset.
/// A value that is present but unparseable is a `ConfigurationError`.
pub fn parse_env_var<T>(key: &str, default: T) -> Result<T, AdssimsimError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().map_err(|e| {
            AdssimsimError::configuration(format!("{} does not parse: {}", key, e), key)
        }),
        Err(_) => Ok(default),
    }
}

/// Load a `.env` file when one is present; a missing file is not an error
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to load .env file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn set_test_env(key: &str, value: &str) {
        env::set_var(key, value);
    }

    fn clear_test_env(key: &str) {
        env::remove_var(key);
    }

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_database_config_from_env() {
        set_test_env("ADSSIMSIM_DATABASE_URL", "postgresql://localhost/test");
        set_test_env("ADSSIMSIM_DATABASE_MAX_CONNECTIONS", "50");
        set_test_env("ADSSIMSIM_DATABASE_MIN_CONNECTIONS", "5");

        let config = DatabaseConfig::from_env().unwrap();
        assert_eq!(config.url, "postgresql://localhost/test");
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.min_connections, 5);

        clear_test_env("ADSSIMSIM_DATABASE_URL");
        clear_test_env("ADSSIMSIM_DATABASE_MAX_CONNECTIONS");
        clear_test_env("ADSSIMSIM_DATABASE_MIN_CONNECTIONS");
    }

    #[test]
    fn test_database_url_fallback() {
        set_test_env("DATABASE_URL", "postgresql://fallback/test");
        let config = DatabaseConfig::from_env().unwrap();
        assert_eq!(config.url, "postgresql://fallback/test");
        clear_test_env("DATABASE_URL");
    }

    #[test]
    fn test_database_config_validation_invalid_url() {
        let config = DatabaseConfig {
            url: "not-a-valid-url".to_string(),
            ..DatabaseConfig::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            AdssimsimError::ConfigurationError { .. }
        ));
    }

    #[test]
    fn test_database_config_validation_min_exceeds_max() {
        let config = DatabaseConfig {
            url: "postgresql://localhost/test".to_string(),
            min_connections: 30,
            max_connections: 20,
            ..DatabaseConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_feed_config_default() {
        let config = FeedConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.dashboard_page_size, 8);
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_feed_config_from_env() {
        set_test_env("ADSSIMSIM_FEED_PAGE_SIZE", "25");
        set_test_env("ADSSIMSIM_FEED_POLL_INTERVAL", "5");

        let config = FeedConfig::from_env().unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.dashboard_page_size, 8);

        clear_test_env("ADSSIMSIM_FEED_PAGE_SIZE");
        clear_test_env("ADSSIMSIM_FEED_POLL_INTERVAL");
    }

    #[test]
    fn test_feed_config_validation_zero_page_size() {
        let config = FeedConfig {
            page_size: 0,
            ..FeedConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_feed_config_validation_zero_poll_interval() {
        let config = FeedConfig {
            poll_interval: Duration::from_secs(0),
            ..FeedConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rewards_config_default() {
        let config = RewardsConfig::default();
        assert_eq!(config.initial_credit, 500);
    }

    #[test]
    fn test_rewards_config_from_env() {
        set_test_env("ADSSIMSIM_REWARDS_INITIAL_CREDIT", "1000");
        let config = RewardsConfig::from_env().unwrap();
        assert_eq!(config.initial_credit, 1000);
        clear_test_env("ADSSIMSIM_REWARDS_INITIAL_CREDIT");
    }

    #[test]
    fn test_rewards_config_validation_negative_credit() {
        let config = RewardsConfig { initial_credit: -1 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_var_with_default() {
        let result: u32 = parse_env_var("NON_EXISTENT_VAR", 42).unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn test_parse_env_var_with_value() {
        set_test_env("TEST_PARSE_VAR", "100");
        let result: u32 = parse_env_var("TEST_PARSE_VAR", 42).unwrap();
        assert_eq!(result, 100);
        clear_test_env("TEST_PARSE_VAR");
    }

    #[test]
    fn test_parse_env_var_invalid_value() {
        set_test_env("TEST_INVALID_VAR", "not-a-number");
        let result: Result<u32, _> = parse_env_var("TEST_INVALID_VAR", 42);
        assert!(result.is_err());
        clear_test_env("TEST_INVALID_VAR");
    }
}
