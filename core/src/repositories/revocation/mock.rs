//! Mock implementation of RevocationStore for testing

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::{DomainError, DomainResult};

use super::r#trait::RevocationStore;

/// Mock revocation store that can be told to fail or to stall
#[derive(Clone, Default)]
pub struct MockRevocationStore {
    pub revoked: Arc<Mutex<HashSet<String>>>,
    pub should_fail: bool,
    pub delay: Option<Duration>,
}

impl MockRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call returns an error
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// A store whose every call sleeps for `delay` first
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn contains(&self, jti: &str) -> bool {
        self.revoked.lock().unwrap().contains(jti)
    }

    async fn simulate(&self) -> DomainResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(DomainError::Internal {
                message: "Mock store failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for MockRevocationStore {
    async fn set(&self, jti: &str, _ttl: Duration) -> DomainResult<()> {
        self.simulate().await?;
        self.revoked.lock().unwrap().insert(jti.to_string());
        Ok(())
    }

    async fn exists(&self, jti: &str) -> DomainResult<bool> {
        self.simulate().await?;
        Ok(self.revoked.lock().unwrap().contains(jti))
    }
}
