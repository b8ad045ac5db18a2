//! Authentication configuration: RS256 key material, token lifetimes and
//! revocation policy

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{env_opt, env_or, Environment};

/// Longest accepted token lifetime in seconds (one year)
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 3600;

/// JWT issuance and verification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// Path to the PEM-encoded RSA private key
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// Path to the PEM-encoded RSA public key
    #[serde(default)]
    pub public_key_path: Option<PathBuf>,

    /// Generate a fresh key pair when the configured keys cannot be loaded
    #[serde(default = "default_auto_generate")]
    pub auto_generate_keys: bool,

    /// Write generated keys to the configured paths
    #[serde(default)]
    pub persist_generated_keys: bool,

    /// JWT issuer claim
    pub issuer: String,

    /// JWT audience claim
    pub audience: String,

    /// Access token lifetime in seconds
    pub access_token_ttl: i64,

    /// Refresh token lifetime in seconds
    pub refresh_token_ttl: i64,

    /// Remaining lifetime (seconds) below which responses carry `X-Token-Expiring`
    #[serde(default = "default_expiring_threshold")]
    pub expiring_threshold: i64,

    /// Treat refresh tokens as single use
    #[serde(default = "default_rotate_refresh_tokens")]
    pub rotate_refresh_tokens: bool,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            private_key_path: None,
            public_key_path: None,
            auto_generate_keys: default_auto_generate(),
            persist_generated_keys: false,
            issuer: String::from("querydesk"),
            audience: String::from("querydesk-api"),
            access_token_ttl: 3600,    // 1 hour
            refresh_token_ttl: 86400,  // 24 hours
            expiring_threshold: default_expiring_threshold(),
            rotate_refresh_tokens: default_rotate_refresh_tokens(),
        }
    }
}

impl JwtConfig {
    /// Create from environment variables
    pub fn from_env(environment: Environment) -> Self {
        let defaults = Self::default();
        Self {
            private_key_path: env_opt("JWT_PRIVATE_KEY_PATH").map(PathBuf::from),
            public_key_path: env_opt("JWT_PUBLIC_KEY_PATH").map(PathBuf::from),
            auto_generate_keys: env_or("JWT_AUTO_GENERATE_KEYS", !environment.is_production()),
            persist_generated_keys: env_or("JWT_PERSIST_GENERATED_KEYS", false),
            issuer: env_opt("JWT_ISSUER").unwrap_or(defaults.issuer),
            audience: env_opt("JWT_AUDIENCE").unwrap_or(defaults.audience),
            access_token_ttl: env_or("JWT_ACCESS_TOKEN_TTL", defaults.access_token_ttl),
            refresh_token_ttl: env_or("JWT_REFRESH_TOKEN_TTL", defaults.refresh_token_ttl),
            expiring_threshold: env_or("JWT_EXPIRING_THRESHOLD", defaults.expiring_threshold),
            rotate_refresh_tokens: env_or(
                "JWT_ROTATE_REFRESH_TOKENS",
                defaults.rotate_refresh_tokens,
            ),
        }
    }

    /// Set key file paths
    pub fn with_key_paths(
        mut self,
        private_key_path: impl Into<PathBuf>,
        public_key_path: impl Into<PathBuf>,
    ) -> Self {
        self.private_key_path = Some(private_key_path.into());
        self.public_key_path = Some(public_key_path.into());
        self
    }

    /// Set access token lifetime in minutes
    pub fn with_access_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_token_ttl = minutes * 60;
        self
    }

    /// Set refresh token lifetime in hours
    pub fn with_refresh_ttl_hours(mut self, hours: i64) -> Self {
        self.refresh_token_ttl = hours * 3600;
        self
    }

    /// Whether both key paths are configured
    pub fn has_key_paths(&self) -> bool {
        self.private_key_path.is_some() && self.public_key_path.is_some()
    }
}

/// Revocation store policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RevocationConfig {
    /// Upper bound for a single store round trip, in milliseconds
    pub timeout_ms: u64,

    /// Deny requests when the store cannot answer
    #[serde(default)]
    pub fail_closed: bool,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 250,
            fail_closed: false,
        }
    }
}

impl RevocationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_ms: env_or("REVOCATION_TIMEOUT_MS", defaults.timeout_ms),
            fail_closed: env_or("REVOCATION_FAIL_CLOSED", defaults.fail_closed),
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT configuration
    pub jwt: JwtConfig,

    /// Revocation store policy
    #[serde(default)]
    pub revocation: RevocationConfig,
}

impl AuthConfig {
    /// Create from environment variables
    pub fn from_env(environment: Environment) -> Self {
        Self {
            jwt: JwtConfig::from_env(environment),
            revocation: RevocationConfig::from_env(),
        }
    }

    /// Validate lifetimes and key sourcing for the given environment
    pub fn validate(&self, environment: Environment) -> Result<(), String> {
        let jwt = &self.jwt;
        for (name, ttl) in [
            ("access_token_ttl", jwt.access_token_ttl),
            ("refresh_token_ttl", jwt.refresh_token_ttl),
        ] {
            if ttl <= 0 || ttl > MAX_TOKEN_TTL_SECS {
                return Err(format!(
                    "{} must be between 1 and {} seconds, got {}",
                    name, MAX_TOKEN_TTL_SECS, ttl
                ));
            }
        }
        if jwt.expiring_threshold < 0 {
            return Err(format!("expiring_threshold must not be negative, got {}", jwt.expiring_threshold));
        }
        if jwt.issuer.is_empty() || jwt.audience.is_empty() {
            return Err("issuer and audience must not be empty".to_string());
        }
        if self.revocation.timeout_ms == 0 {
            return Err("revocation timeout_ms must be positive".to_string());
        }
        if environment.is_production() && !jwt.has_key_paths() {
            return Err("production requires JWT_PRIVATE_KEY_PATH and JWT_PUBLIC_KEY_PATH".to_string());
        }
        if !jwt.has_key_paths() && !jwt.auto_generate_keys {
            return Err("no key paths configured and key generation is disabled".to_string());
        }
        Ok(())
    }
}

fn default_auto_generate() -> bool {
    true
}

fn default_expiring_threshold() -> i64 {
    300  // 5 minutes
}

fn default_rotate_refresh_tokens() -> bool {
    true
}
