//! Shared PostgreSQL connection pool
//!
//! Pool establishment is retried with backoff, since it runs at startup
//! when the database may still be coming up.

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::{ConfigLoader, DatabaseConfig};
use crate::error::AdssimsimError;
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Shared database connection pool
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Create a new database pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self, AdssimsimError> {
        config.validate()?;

        info!(
            max_connections = config.max_connections,
            "connecting to database"
        );

        let pool = retry_with_backoff(
            || async {
                PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .min_connections(config.min_connections)
                    .idle_timeout(Some(config.idle_timeout))
                    .acquire_timeout(config.connect_timeout)
                    .connect(&config.url)
                    .await
                    .map_err(|e| AdssimsimError::from_sqlx(e, "pool_connect"))
            },
            RetryPolicy::aggressive(),
            |err: &AdssimsimError| err.is_retryable(),
        )
        .await?;

        info!("database connection pool established");
        Ok(Self { pool })
    }

    /// Create a pool from environment configuration
    pub async fn from_env() -> Result<Self, AdssimsimError> {
        Self::new(&DatabaseConfig::from_env()?).await
    }

    /// Get reference to the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the pool can still reach the database
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }
}

/// Pool statistics
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let config = DatabaseConfig {
            url: "not-a-url".to_string(),
            ..DatabaseConfig::default()
        };

        let result = DatabasePool::new(&config).await;
        assert!(matches!(
            result,
            Err(AdssimsimError::ConfigurationError { .. })
        ));
    }
}
