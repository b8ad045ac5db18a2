//! Configuration for the token service

use std::time::Duration;

use qd_shared::config::AuthConfig;

use crate::domain::entities::token::{
    DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS, JWT_AUDIENCE, JWT_ISSUER,
};

/// Configuration for the token service
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// Issuer written to and required in every token
    pub issuer: String,
    /// Audience written to and required in every token
    pub audience: String,
    /// Access token lifetime in seconds
    pub access_token_ttl: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl: i64,
    /// Treat refresh tokens as single use
    pub rotate_refresh_tokens: bool,
    /// Upper bound on each revocation store call
    pub revocation_timeout: Duration,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            issuer: JWT_ISSUER.to_string(),
            audience: JWT_AUDIENCE.to_string(),
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            rotate_refresh_tokens: true,
            revocation_timeout: Duration::from_millis(250),
        }
    }
}

impl TokenServiceConfig {
    /// Builds the service configuration from the application auth settings
    pub fn from_auth_config(config: &AuthConfig) -> Self {
        Self {
            issuer: config.jwt.issuer.clone(),
            audience: config.jwt.audience.clone(),
            access_token_ttl: config.jwt.access_token_ttl,
            refresh_token_ttl: config.jwt.refresh_token_ttl,
            rotate_refresh_tokens: config.jwt.rotate_refresh_tokens,
            revocation_timeout: Duration::from_millis(config.revocation.timeout_ms),
        }
    }
}
