//! Revocation store trait: the bookkeeping behind token revocation and
//! one-time refresh tokens.

use async_trait::async_trait;
use std::time::Duration;

use crate::errors::DomainResult;

/// Store of revoked token identifiers (JTIs)
///
/// Entries only need to live as long as the token they name, so every
/// write carries a TTL equal to the token's remaining lifetime.
/// Implementations must tolerate concurrent calls from many requests.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Mark a JTI as revoked for `ttl`
    ///
    /// # Arguments
    /// * `jti` - Token identifier
    /// * `ttl` - How long the marker must survive
    ///
    /// # Returns
    /// * `Ok(())` - Marker written
    /// * `Err(DomainError)` - Store unreachable or write failed
    async fn set(&self, jti: &str, ttl: Duration) -> DomainResult<()>;

    /// Check whether a JTI is currently marked
    ///
    /// # Returns
    /// * `Ok(true)` - Marker present and not expired
    /// * `Ok(false)` - No marker
    /// * `Err(DomainError)` - Store unreachable
    async fn exists(&self, jti: &str) -> DomainResult<bool>;

    /// Write a marker only if none exists
    ///
    /// # Returns
    /// * `Ok(true)` - This call wrote the marker (first use)
    /// * `Ok(false)` - A marker was already present
    ///
    /// The provided implementation is check-then-set and can let two
    /// concurrent callers both win. Stores with an atomic primitive should
    /// override it.
    async fn record_once(&self, jti: &str, ttl: Duration) -> DomainResult<bool> {
        if self.exists(jti).await? {
            return Ok(false);
        }
        self.set(jti, ttl).await?;
        Ok(true)
    }
}
