use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Reservations hold a flight lock across several round trips, so a
/// connection must be available quickly or the lock TTL is wasted waiting.
pub async fn connect(config: &Config) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(32)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(config.lock_ttl / 2)
        .sqlx_logging(false);

    Database::connect(options)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to connect to database: {}", e)))
}
