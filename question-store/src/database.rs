//! Database connection pool management

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{sanitize_url, DatabaseError, Result};

/// Create a PostgreSQL connection pool with retry logic
///
/// Connection attempts are retried `max_retries` times with exponential
/// backoff starting at `retry_delay_secs`.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Database connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "Database connection pool created: max={}, min={}",
                        config.max_connections,
                        config.min_connections
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        config.max_retries + 1,
                        e
                    );
                    return Err(e.into());
                }

                let delay = backoff_delay(base_delay, attempt);

                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Attempt to create a database pool (single try)
async fn try_create_pool(config: &DatabaseConfig) -> std::result::Result<PgPool, DatabaseError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connection_timeout())
        .connect(&config.url)
        .await
        .map_err(|e| {
            DatabaseError::from(e).add_context(format!("url={}", sanitize_url(&config.url)))
        })
}

/// Upper bound for the delay between connection attempts
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Delay before retry number `attempt` (1-based), capped at [`MAX_RETRY_DELAY`]
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    2_u32
        .checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| base.checked_mul(factor))
        .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_secs(2);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(16));
    }

    #[test]
    fn test_backoff_is_capped_for_large_attempts() {
        let base = Duration::from_secs(2);
        assert_eq!(backoff_delay(base, 6), Duration::from_secs(60));
        assert_eq!(backoff_delay(base, 34), MAX_RETRY_DELAY);
        assert_eq!(backoff_delay(base, u32::MAX), MAX_RETRY_DELAY);
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_retries() {
        let config = DatabaseConfig {
            url: "not-a-database-url".to_string(),
            max_connections: 1,
            min_connections: 0,
            connection_timeout_secs: 1,
            max_retries: 0,
            retry_delay_secs: 0,
            statement_timeout_secs: 1,
        };

        let err = create_pool(&config).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Database(_)));
    }
}
