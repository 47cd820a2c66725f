//! Postgres pool construction and schema migrations.

use log::{info, warn};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

/// Opens the connection pool, retrying the initial connection
/// `connect_retries` times with `retry_delay` between attempts.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(0)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout);

    let attempts = config.connect_retries.max(1);
    let mut attempt = 1;
    loop {
        match options.clone().connect(&config.url).await {
            Ok(pool) => {
                info!(
                    "Connected to database (max_connections={}, attempt {}/{})",
                    config.max_connections, attempt, attempts
                );
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                warn!(
                    "Database connection attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt, attempts, e, config.retry_delay
                );
                tokio::time::sleep(config.retry_delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Applies the embedded migrations under `migrations/`.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
