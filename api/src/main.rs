use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use qd_api::{run_server, telemetry, AppState, HealthProbes};
use qd_core::errors::DomainError;
use qd_core::repositories::{InMemoryRevocationStore, RevocationStore};
use qd_core::services::rate_limit::RateLimiter;
use qd_core::services::token::{KeyManager, TokenService, TokenServiceConfig};
use qd_infra::{create_pool, RedisRevocationStore};
use qd_shared::config::AppConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    telemetry::init_tracing(&config.logging)?;

    config
        .validate()
        .map_err(|message| DomainError::Configuration { message })
        .context("invalid configuration")?;

    info!(environment = %config.environment, "Starting QueryDesk API Server");

    let keys = KeyManager::load_or_generate(&config.auth.jwt).context("loading signing keys")?;
    info!(source = ?keys.source(), "Signing keys ready");

    let rate_limiter = if config.rate_limit.enabled {
        Some(Arc::new(RateLimiter::from_config(&config.rate_limit)?))
    } else {
        warn!("Rate limiting is disabled");
        None
    };

    let database = config
        .database
        .as_ref()
        .map(create_pool)
        .transpose()
        .context("creating database pool")?;

    match config.cache.clone() {
        Some(cache) => {
            let store = RedisRevocationStore::connect(cache)
                .await
                .context("connecting to Redis")?;
            let health = HealthProbes {
                revocation_backend: "redis",
                redis: Some(store.client().clone()),
                database,
            };
            serve(&config, keys, store, rate_limiter, health).await
        }
        None => {
            warn!("REDIS_URL not set, revocations are kept in process memory");
            let health = HealthProbes {
                database,
                ..HealthProbes::in_memory()
            };
            serve(&config, keys, InMemoryRevocationStore::new(), rate_limiter, health).await
        }
    }
}

async fn serve<R>(
    config: &AppConfig,
    keys: KeyManager,
    store: R,
    rate_limiter: Option<Arc<RateLimiter>>,
    health: HealthProbes,
) -> anyhow::Result<()>
where
    R: RevocationStore + 'static,
{
    let token_config = TokenServiceConfig::from_auth_config(&config.auth);
    let token_service = Arc::new(TokenService::new(store, keys, token_config));

    let state = AppState::new(token_service, rate_limiter)
        .with_auth_config(config.auth.clone())
        .with_health(health);

    let sweep_interval = Duration::from_secs(config.rate_limit.sweep_interval);
    run_server(&config.server, sweep_interval, state)
        .await
        .context("running HTTP server")
}
