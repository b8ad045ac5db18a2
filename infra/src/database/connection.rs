//! Database connection pool management
//!
//! This module provides a lazily connected Postgres pool using SQLx. No
//! connection is opened until the pool is first used.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

use crate::InfrastructureError;
use qd_shared::config::DatabaseConfig;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DatabasePool {
    /// SQLx Postgres connection pool
    pool: PgPool,
    /// Configuration used to create this pool
    config: DatabaseConfig,
}

impl DatabasePool {
    /// Get a reference to the underlying SQLx pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Configuration the pool was built from
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Check if the database connection is healthy
    ///
    /// Performs a simple query to verify connectivity. This is the first
    /// point at which a lazily created pool actually connects.
    ///
    /// # Returns
    /// * `Result<bool, InfrastructureError>` - True if healthy, error otherwise
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        tracing::debug!("Performing database health check");

        let row = sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                InfrastructureError::Database(e)
            })?;

        let value: i32 = row.try_get(0)?;
        if value == 1 {
            tracing::debug!("Database health check passed");
            Ok(true)
        } else {
            tracing::warn!("Database health check returned unexpected value: {}", value);
            Ok(false)
        }
    }
}

/// Create a lazily connected pool from `config`
///
/// # Arguments
/// * `config` - Database configuration settings
///
/// # Returns
/// * `Ok(DatabasePool)` - Pool ready for use; nothing has connected yet
/// * `Err(InfrastructureError::Config)` - The URL could not be parsed
///
/// Must be called from within a tokio runtime.
pub fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool, InfrastructureError> {
    tracing::info!(
        max_connections = config.max_connections,
        "Creating lazy database connection pool"
    );

    let connect_options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| InfrastructureError::Config(format!("Invalid database URL: {}", e)))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .idle_timeout(Duration::from_secs(config.idle_timeout))
        .connect_lazy_with(connect_options);

    Ok(DatabasePool {
        pool,
        config: config.clone(),
    })
}
