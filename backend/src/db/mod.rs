//! Database connection and pool management
//!
//! The pool is created once at startup. The first connection is retried a
//! few times so the server can come up alongside a database container that
//! is still starting.

use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use metrics::gauge;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Pool tuning derived from [`DatabaseConfig`]
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub connect_attempts: u32,
    pub retry_delay: Duration,
}

impl From<&DatabaseConfig> for PoolSettings {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections.max(1),
            min_connections: config.max_connections.clamp(1, 2),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
            connect_attempts: 5,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Create the PostgreSQL pool, retrying the initial connection
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let settings = PoolSettings::from(config);
    let connect_options = PgConnectOptions::from_str(&config.url)
        .context("invalid database url")?
        .application_name("babylog");

    let mut attempt = 1;
    loop {
        let result = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(settings.idle_timeout)
            .max_lifetime(settings.max_lifetime)
            .test_before_acquire(true)
            .connect_with(connect_options.clone())
            .await;

        match result {
            Ok(pool) => {
                info!(
                    max = settings.max_connections,
                    min = settings.min_connections,
                    "Database pool created"
                );
                return Ok(pool);
            }
            Err(e) if attempt < settings.connect_attempts => {
                warn!(attempt, error = %e, "Database not reachable yet, retrying");
                tokio::time::sleep(settings.retry_delay * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e).context("failed to connect to database"),
        }
    }
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed successfully");
    Ok(())
}

/// Check database health and publish pool gauges
pub async fn health_check(pool: &PgPool) -> Result<()> {
    gauge!("babylog_db_pool_connections").set(pool.size() as f64);
    gauge!("babylog_db_pool_idle").set(pool.num_idle() as f64);

    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| {
            warn!("Database health check failed: {}", e);
            e.into()
        })
}
