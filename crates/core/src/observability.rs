//! Logging initialization
//!
//! Structured logging via `tracing`. Call [`init_logging`] once at startup;
//! `RUST_LOG` overrides the configured default filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::AdssimsimError;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub default_filter: String,
    /// Include thread ids and targets in output
    pub verbose_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            verbose_format: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    ///
    /// - `ADSSIMSIM_LOG_FILTER`: default filter when `RUST_LOG` is unset
    /// - `ADSSIMSIM_LOG_VERBOSE`: "true" or "1" enables the verbose format
    pub fn from_env() -> Self {
        let default_filter =
            std::env::var("ADSSIMSIM_LOG_FILTER").unwrap_or_else(|_| "info".to_string());

        let verbose_format = std::env::var("ADSSIMSIM_LOG_VERBOSE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            default_filter,
            verbose_format,
        }
    }
}

/// Initialize the global tracing subscriber
///
/// Must be called once at application startup.
///
/// # Errors
///
/// Returns a `ConfigurationError` if a subscriber is already installed or
/// the filter directive cannot be parsed.
pub fn init_logging(config: &LogConfig) -> Result<(), AdssimsimError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .map_err(|e| AdssimsimError::ConfigurationError {
            message: format!("Invalid log filter: {}", e),
            key: Some("ADSSIMSIM_LOG_FILTER".to_string()),
        })?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(config.verbose_format)
        .with_thread_ids(config.verbose_format);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AdssimsimError::ConfigurationError {
            message: format!("Failed to initialize logging: {}", e),
            key: None,
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.default_filter, "info");
        assert!(!config.verbose_format);
    }

    #[test]
    fn test_from_env_reads_filter() {
        std::env::set_var("ADSSIMSIM_LOG_FILTER", "debug");
        std::env::set_var("ADSSIMSIM_LOG_VERBOSE", "1");

        let config = LogConfig::from_env();
        assert_eq!(config.default_filter, "debug");
        assert!(config.verbose_format);

        std::env::remove_var("ADSSIMSIM_LOG_FILTER");
        std::env::remove_var("ADSSIMSIM_LOG_VERBOSE");
    }
}
