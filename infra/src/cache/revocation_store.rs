//! Redis-backed revocation store
//!
//! Each revoked JTI becomes a key `<prefix>:<jti>` whose Redis TTL matches
//! the token's remaining lifetime, so markers disappear on their own.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use qd_core::errors::DomainResult;
use qd_core::repositories::RevocationStore;
use qd_shared::config::CacheConfig;

use super::redis_client::RedisClient;
use crate::InfrastructureError;

/// Value stored under every revocation key
const MARKER: &str = "1";

/// [`RevocationStore`] over a shared Redis connection
#[derive(Clone)]
pub struct RedisRevocationStore {
    client: RedisClient,
    config: CacheConfig,
}

impl RedisRevocationStore {
    /// Wrap an existing client; keys are namespaced by `config.key_prefix`
    pub fn new(client: RedisClient, config: CacheConfig) -> Self {
        Self { client, config }
    }

    /// Connect to Redis and build the store
    ///
    /// # Returns
    /// * `Ok(Self)` - Connected store
    /// * `Err(InfrastructureError)` - URL invalid or Redis unreachable after retries
    pub async fn connect(config: CacheConfig) -> Result<Self, InfrastructureError> {
        let client = RedisClient::new(&config).await?;
        Ok(Self::new(client, config))
    }

    /// Underlying client, for health checks
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    fn key(&self, jti: &str) -> String {
        self.config.make_key(jti)
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn set(&self, jti: &str, ttl: Duration) -> DomainResult<()> {
        let key = self.key(jti);
        self.client
            .set_with_expiry(&key, MARKER, ttl_secs(ttl))
            .await?;
        debug!(jti = %jti, ttl_secs = ttl_secs(ttl), "Revocation marker written");
        Ok(())
    }

    async fn exists(&self, jti: &str) -> DomainResult<bool> {
        Ok(self.client.exists(&self.key(jti)).await?)
    }

    async fn record_once(&self, jti: &str, ttl: Duration) -> DomainResult<bool> {
        let key = self.key(jti);
        Ok(self
            .client
            .set_nx_with_expiry(&key, MARKER, ttl_secs(ttl))
            .await?)
    }
}

/// Whole seconds for `EX`, rounded up; Redis rejects an expiry of zero
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}
