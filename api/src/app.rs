//! Application state and factory
//!
//! This module holds the state shared by all handlers and builds the
//! Actix-web application with the authentication chain on each route.

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, App, Error, HttpResponse, HttpServer,
};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use qd_core::repositories::RevocationStore;
use qd_core::services::rate_limit::{spawn_sweeper, RateLimiter};
use qd_core::services::token::TokenService;
use qd_infra::{DatabasePool, RedisClient};
use qd_shared::config::{AuthConfig, ServerConfig};

use crate::handlers::ApiError;
use crate::middleware::{AccessTokenVerifier, JwtAuth, RateLimit, RequireRole};
use crate::routes;

/// Dependencies the health endpoint reports on
#[derive(Clone, Default)]
pub struct HealthProbes {
    /// `"redis"` or `"memory"`
    pub revocation_backend: &'static str,
    pub redis: Option<RedisClient>,
    pub database: Option<DatabasePool>,
}

impl HealthProbes {
    pub fn in_memory() -> Self {
        Self {
            revocation_backend: "memory",
            ..Default::default()
        }
    }
}

/// State shared by all workers
pub struct AppState<R: RevocationStore> {
    pub token_service: Arc<TokenService<R>>,
    /// `None` when rate limiting is disabled
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub auth: AuthConfig,
    pub health: HealthProbes,
}

impl<R: RevocationStore> AppState<R> {
    pub fn new(token_service: Arc<TokenService<R>>, rate_limiter: Option<Arc<RateLimiter>>) -> Self {
        Self {
            token_service,
            rate_limiter,
            auth: AuthConfig::default(),
            health: HealthProbes::in_memory(),
        }
    }

    pub fn with_auth_config(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_health(mut self, health: HealthProbes) -> Self {
        self.health = health;
        self
    }
}

/// Create and configure the application with all dependencies
///
/// Middleware order per route, outermost first: `JwtAuth`, then
/// `RequireRole`, then `RateLimit`.
pub fn create_app<R>(
    state: web::Data<AppState<R>>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
>
where
    R: RevocationStore + 'static,
{
    let verifier: Arc<dyn AccessTokenVerifier> = state.token_service.clone();
    let jwt = JwtAuth::from_config(verifier, &state.auth);
    let rate_limit = match &state.rate_limiter {
        Some(limiter) => RateLimit::new(Arc::clone(limiter)),
        None => RateLimit::disabled(),
    };

    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::Validation(err.to_string()).into());

    App::new()
        .app_data(state)
        .app_data(json_config)
        .route("/health", web::get().to(routes::health::health_check::<R>))
        .service(
            web::scope("/api/v1")
                .service(
                    web::scope("/auth")
                        .route(
                            "/refresh",
                            web::post().to(routes::auth::refresh::refresh_token::<R>),
                        )
                        .service(
                            web::resource("/logout")
                                .wrap(jwt.clone())
                                .route(web::post().to(routes::auth::logout::logout::<R>)),
                        ),
                )
                .service(
                    web::resource("/me")
                        .wrap(rate_limit.clone())
                        .wrap(jwt.clone())
                        .route(web::get().to(routes::me::me)),
                )
                .service(
                    web::scope("/admin")
                        .wrap(rate_limit)
                        .wrap(RequireRole::admin())
                        .wrap(jwt)
                        .route("/status", web::get().to(routes::admin::status::<R>)),
                ),
        )
        .default_service(web::route().to(not_found))
}

/// Run the HTTP server until shutdown
///
/// Starts the rate limiter's idle-bucket sweeper for the lifetime of the
/// server.
pub async fn run_server<R>(
    server: &ServerConfig,
    sweep_interval: std::time::Duration,
    state: AppState<R>,
) -> std::io::Result<()>
where
    R: RevocationStore + 'static,
{
    let sweeper = state
        .rate_limiter
        .as_ref()
        .map(|limiter| spawn_sweeper(Arc::clone(limiter), sweep_interval));

    let state = web::Data::new(state);
    let bind_address = server.bind_address();
    tracing::info!(address = %bind_address, "Server will bind");

    let mut http = HttpServer::new(move || create_app(state.clone()).wrap(TracingLogger::default()));
    if server.workers > 0 {
        http = http.workers(server.workers);
    }
    let result = http.bind(&bind_address)?.run().await;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    tracing::info!("Server stopped");
    result
}

/// Default 404 handler
async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "code": "NOT_FOUND",
        "message": "The requested resource was not found"
    }))
}
