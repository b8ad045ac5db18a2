//! Helpers shared by the API integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use async_trait::async_trait;

use qd_api::AppState;
use qd_core::errors::{DomainError, DomainResult};
use qd_core::repositories::{InMemoryRevocationStore, RevocationStore};
use qd_core::services::rate_limit::RateLimiter;
use qd_core::services::token::{KeyManager, TokenService, TokenServiceConfig};

pub const PRIVATE_PEM: &str = include_str!("../../../core/tests/fixtures/service_private.pem");
pub const PUBLIC_PEM: &str = include_str!("../../../core/tests/fixtures/service_public.pem");

/// Revocation store whose every call fails
#[derive(Debug, Default, Clone)]
pub struct FailingStore;

#[async_trait]
impl RevocationStore for FailingStore {
    async fn set(&self, _jti: &str, _ttl: Duration) -> DomainResult<()> {
        Err(DomainError::Internal {
            message: "store offline".into(),
        })
    }

    async fn exists(&self, _jti: &str) -> DomainResult<bool> {
        Err(DomainError::Internal {
            message: "store offline".into(),
        })
    }
}

pub fn keys() -> KeyManager {
    KeyManager::from_pem_strings(PRIVATE_PEM, PUBLIC_PEM).unwrap()
}

pub fn token_service_with<R: RevocationStore>(store: R, config: TokenServiceConfig) -> Arc<TokenService<R>> {
    Arc::new(TokenService::new(store, keys(), config))
}

pub fn token_service() -> Arc<TokenService<InMemoryRevocationStore>> {
    token_service_with(InMemoryRevocationStore::new(), TokenServiceConfig::default())
}

pub fn limiter(burst: u32, rps: f64) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(burst, rps, Duration::from_secs(600)).unwrap())
}

pub fn state<R: RevocationStore>(
    service: Arc<TokenService<R>>,
    rate_limiter: Option<Arc<RateLimiter>>,
) -> web::Data<AppState<R>> {
    web::Data::new(AppState::new(service, rate_limiter))
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
