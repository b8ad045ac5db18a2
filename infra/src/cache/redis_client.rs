//! Redis cache client implementation
//!
//! This module provides a Redis client over a multiplexed connection with
//! retry logic, and the small set of commands the revocation store needs:
//! set with expiry, set-if-absent with expiry, existence checks and PING.

use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::InfrastructureError;
use qd_shared::config::CacheConfig;

/// Upper bound for the exponential backoff between attempts
const MAX_BACKOFF_MS: u64 = 5000;

/// Redis client with connection reuse and retry logic
///
/// Cloning is cheap: all clones share the same multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Maximum number of attempts for connecting and for retriable operations
    max_retries: u32,
    /// Base delay between retries (exponential backoff)
    retry_delay_ms: u64,
}

impl RedisClient {
    /// Connect using the retry settings from `config`
    ///
    /// # Arguments
    /// * `config` - Cache configuration settings
    ///
    /// # Returns
    /// * `Result<Self, InfrastructureError>` - Redis client or error
    ///
    /// # Example
    /// ```no_run
    /// use qd_infra::cache::{CacheConfig, RedisClient};
    ///
    /// async fn create_client() -> Result<RedisClient, Box<dyn std::error::Error>> {
    ///     let config = CacheConfig::new("redis://localhost:6379");
    ///     let client = RedisClient::new(&config).await?;
    ///     Ok(client)
    /// }
    /// ```
    pub async fn new(config: &CacheConfig) -> Result<Self, InfrastructureError> {
        Self::new_with_retry_config(&config.url, config.max_retries, config.retry_delay_ms).await
    }

    /// Create a new Redis client with custom retry configuration
    ///
    /// # Arguments
    /// * `url` - Redis connection URL
    /// * `max_retries` - Maximum number of attempts (at least one is made)
    /// * `retry_delay_ms` - Base delay between retries in milliseconds
    pub async fn new_with_retry_config(
        url: &str,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<Self, InfrastructureError> {
        info!("Creating Redis client with URL: {}", mask_url(url));

        let client = Client::open(url).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let max_retries = max_retries.max(1);
        let connection =
            Self::create_connection_with_retry(client, max_retries, retry_delay_ms).await?;

        info!("Redis client created successfully");

        Ok(Self {
            connection,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create multiplexed connection with retry logic
    async fn create_connection_with_retry(
        client: Client,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            match client.get_multiplexed_async_connection().await {
                Ok(connection) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_retries => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = next_delay(delay);
                }
                Err(e) => {
                    error!("Failed to connect to Redis after {} attempts: {}", attempts, e);
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    /// Set a value with expiration time
    ///
    /// # Arguments
    /// * `key` - Cache key
    /// * `value` - Value to store
    /// * `expiry_seconds` - Time to live in seconds
    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry_seconds: u64,
    ) -> Result<(), InfrastructureError> {
        debug!("Setting key '{}' with expiry {}s", key, expiry_seconds);

        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            let value = value.to_string();

            Box::pin(async move { conn.set_ex::<_, _, ()>(key, value, expiry_seconds).await })
        })
        .await
        .map_err(|e| {
            error!("Failed to set key '{}': {}", key, e);
            InfrastructureError::Cache(e)
        })
    }

    /// Set a value with expiration only if the key is absent (`SET NX EX`)
    ///
    /// Not retried: if the reply to a successful write is lost, a retry
    /// would find its own marker and report the key as already present.
    ///
    /// # Returns
    /// * `Ok(true)` - The key was written by this call
    /// * `Ok(false)` - The key already existed
    pub async fn set_nx_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry_seconds: u64,
    ) -> Result<bool, InfrastructureError> {
        debug!("Setting key '{}' if absent with expiry {}s", key, expiry_seconds);

        let mut conn = self.connection.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(expiry_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Failed to set key '{}' if absent: {}", key, e);
                InfrastructureError::Cache(e)
            })?;

        Ok(reply.is_some())
    }

    /// Check if a key exists in cache
    ///
    /// # Arguments
    /// * `key` - Cache key
    ///
    /// # Returns
    /// * `Result<bool, InfrastructureError>` - True if key exists
    pub async fn exists(&self, key: &str) -> Result<bool, InfrastructureError> {
        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();

                Box::pin(async move { conn.exists::<_, bool>(key).await })
            })
            .await;

        match result {
            Ok(exists) => {
                debug!("Key '{}' exists: {}", key, exists);
                Ok(exists)
            }
            Err(e) => {
                error!("Failed to check key '{}' existence: {}", key, e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Check if the Redis connection is healthy
    ///
    /// Performs a PING command to verify connectivity.
    ///
    /// # Returns
    /// * `Result<bool, InfrastructureError>` - True if healthy, error otherwise
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        debug!("Performing Redis health check");

        let result = self
            .execute_with_retry(|mut conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await;

        match result {
            Ok(response) if response == "PONG" => {
                debug!("Redis health check passed");
                Ok(true)
            }
            Ok(response) => {
                warn!("Redis health check returned unexpected response: {}", response);
                Ok(false)
            }
            Err(e) => {
                error!("Redis health check failed: {}", e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Execute a Redis operation with automatic retry logic
    ///
    /// Only transient errors are retried, with exponential backoff starting
    /// at the configured delay.
    async fn execute_with_retry<F, T>(&self, operation: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay_ms;

        loop {
            attempts += 1;
            let conn = self.connection.clone();

            match operation(conn).await {
                Ok(result) => return Ok(result),
                Err(e) if attempts < self.max_retries && is_retriable_error(&e) => {
                    warn!(
                        "Redis operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, self.max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = next_delay(delay);
                }
                Err(e) => {
                    error!("Redis operation failed after {} attempts: {}", attempts, e);
                    return Err(e);
                }
            }
        }
    }
}

/// Doubles the delay, capped at [`MAX_BACKOFF_MS`]
pub(crate) fn next_delay(delay_ms: u64) -> u64 {
    delay_ms.saturating_mul(2).min(MAX_BACKOFF_MS)
}

/// Check if a Redis error is transient and the operation should be retried
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::ClientError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Mask credentials in a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let (Some(at_pos), Some(proto_end)) = (url.rfind('@'), url.find("://")) {
        if at_pos > proto_end {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
