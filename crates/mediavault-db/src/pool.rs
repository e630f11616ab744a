//! PostgreSQL connection pool for the note store.
//!
//! The API server builds a [`PoolConfig`] from `MEDIAVAULT_DB_*` variables
//! and hands it to [`crate::Database::connect_with_config`]. Unset or
//! unparsable values fall back to the defaults below.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use mediavault_core::{Error, Result};

/// Default maximum number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default time to wait for a free connection, in seconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default time an unused connection stays open, in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Sizing and timeouts for the note store pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on open connections (`MEDIAVAULT_DB_MAX_CONNECTIONS`).
    pub max_connections: u32,
    /// Connections kept open while idle (`MEDIAVAULT_DB_MIN_CONNECTIONS`).
    pub min_connections: u32,
    /// How long a query waits for a connection before failing
    /// (`MEDIAVAULT_DB_ACQUIRE_TIMEOUT_SECS`).
    pub acquire_timeout: Duration,
    /// Idle connections above `min_connections` close after this long.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fallback = Self::default();
        let parse_u32 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u32>().ok());
        let parse_secs = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        let max_connections = parse_u32("MEDIAVAULT_DB_MAX_CONNECTIONS")
            .filter(|n| *n > 0)
            .unwrap_or(fallback.max_connections);
        // sqlx rejects min > max.
        let min_connections = parse_u32("MEDIAVAULT_DB_MIN_CONNECTIONS")
            .unwrap_or(fallback.min_connections)
            .min(max_connections);

        Self {
            max_connections,
            min_connections,
            acquire_timeout: parse_secs("MEDIAVAULT_DB_ACQUIRE_TIMEOUT_SECS")
                .unwrap_or(fallback.acquire_timeout),
            idle_timeout: fallback.idle_timeout,
        }
    }
}

/// Open a pool against `database_url`, failing if no connection can be made.
pub async fn create_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    info!(
        subsystem = "database",
        component = "pool",
        op = "create",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        "Creating database connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database connection pool established"
    );
    Ok(pool)
}
