pub mod reports;
pub mod schema;
pub mod users;

use anyhow::{Context, Result};
use sqlx::{pool::PoolOptions, MySql, Pool};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;

const MAX_RETRIES: u32 = 10;
const INITIAL_RETRY_DELAY_SECS: u64 = 2;
const MAX_RETRY_DELAY_SECS: u64 = 30;

/// Connects to MySQL, retrying with exponential backoff while the database comes up.
pub async fn create_pool(config: &Config) -> Result<Pool<MySql>> {
    let database_url = format!("{}?charset=utf8mb4", config.database_url());
    info!("Connecting to {}", config.masked_database_url());

    let mut last_error = None;

    for attempt in 1..=MAX_RETRIES {
        info!("Connection attempt {} of {}", attempt, MAX_RETRIES);

        let pool_options = PoolOptions::<MySql>::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800));

        match pool_options.connect(&database_url).await {
            Ok(pool) => match test_connection_with_retries(&pool, 3).await {
                Ok(()) => {
                    info!(
                        "Database connected successfully to {}:{}/{}",
                        config.db_host, config.db_port, config.db_name
                    );
                    return Ok(pool);
                }
                Err(e) => {
                    warn!("Connection pool created but test query failed: {}. Retrying...", e);
                    last_error = Some(e);
                }
            },
            Err(e) => {
                warn!("Connection attempt {} failed: {}", attempt, e);
                last_error = Some(anyhow::anyhow!("{}", e));
            }
        }

        if attempt < MAX_RETRIES {
            let delay_secs = retry_delay_secs(attempt);
            info!("Waiting {} seconds before next attempt...", delay_secs);
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Failed to connect after {} attempts", MAX_RETRIES)))
        .context("Failed to establish database connection after all retries")
}

/// True when the error is a UNIQUE / PRIMARY KEY violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map_or(false, |db| db.is_unique_violation())
}

// 2s, 4s, 8s, 16s, then capped at 30s.
fn retry_delay_secs(attempt: u32) -> u64 {
    std::cmp::min(
        INITIAL_RETRY_DELAY_SECS.saturating_mul(1u64 << (attempt - 1).min(16)),
        MAX_RETRY_DELAY_SECS,
    )
}

async fn test_connection_with_retries(pool: &Pool<MySql>, max_retries: u32) -> Result<()> {
    for attempt in 1..=max_retries {
        match sqlx::query("SELECT 1").fetch_one(pool).await {
            Ok(_) => return Ok(()),
            Err(e) if attempt < max_retries => {
                warn!("Test query failed on attempt {}: {}. Retrying...", attempt, e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(e) => return Err(e).context("Test query failed after all retries"),
        }
    }
    Err(anyhow::anyhow!("Test query failed after {} attempts", max_retries))
}
