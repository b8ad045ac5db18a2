//! Process-local revocation store used when no Redis URL is configured.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::errors::DomainResult;

use super::r#trait::RevocationStore;

/// In-memory revocation store keyed by JTI
///
/// Each entry holds its expiry instant. Expired entries are treated as
/// absent and removed when next touched or by [`purge_expired`].
///
/// [`purge_expired`]: InMemoryRevocationStore::purge_expired
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    entries: DashMap<String, Instant>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, expires_at| {
            let keep = *expires_at > now;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn set(&self, jti: &str, ttl: Duration) -> DomainResult<()> {
        self.entries.insert(jti.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn exists(&self, jti: &str) -> DomainResult<bool> {
        let now = Instant::now();
        // remove_if takes the shard write lock, so a concurrent set cannot
        // be lost between the check and the removal.
        if self.entries.remove_if(jti, |_, expires_at| *expires_at <= now).is_some() {
            return Ok(false);
        }
        Ok(self.entries.contains_key(jti))
    }

    async fn record_once(&self, jti: &str, ttl: Duration) -> DomainResult<bool> {
        let now = Instant::now();
        match self.entries.entry(jti.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    Ok(false)
                } else {
                    entry.insert(now + ttl);
                    Ok(true)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now + ttl);
                Ok(true)
            }
        }
    }
}
