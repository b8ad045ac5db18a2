//! Main token service implementation

use std::future::Future;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::Deserialize;
use tracing::{debug, warn};

use qd_shared::config::MAX_TOKEN_TTL_SECS;

use crate::domain::entities::token::{Claims, TokenPair, TokenType};
use crate::errors::{DomainError, DomainResult, TokenError};
use crate::repositories::RevocationStore;

use super::config::TokenServiceConfig;
use super::key_manager::KeyManager;

/// The only algorithm this service signs with or accepts
pub const JWT_ALGORITHM: Algorithm = Algorithm::RS256;

/// Header algorithms allowed past the pre-flight check
const RSA_FAMILY: [&str; 3] = ["RS256", "RS384", "RS512"];

/// Only the fields of the JOSE header the pre-flight check looks at
#[derive(Deserialize)]
struct HeaderProbe {
    alg: String,
}

/// Service for issuing, validating, refreshing and revoking JWTs
pub struct TokenService<R: RevocationStore> {
    store: R,
    config: TokenServiceConfig,
    keys: KeyManager,
    validation: Validation,
}

impl<R: RevocationStore> std::fmt::Debug for TokenService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("config", &self.config)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl<R: RevocationStore> TokenService<R> {
    /// Creates a new token service instance
    ///
    /// # Arguments
    ///
    /// * `store` - Revocation store for JTI bookkeeping
    /// * `keys` - RS256 key pair
    /// * `config` - Token service configuration
    pub fn new(store: R, keys: KeyManager, config: TokenServiceConfig) -> Self {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            store,
            config,
            keys,
            validation,
        }
    }

    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    /// Generates a new token pair (access + refresh tokens) for a user
    ///
    /// # Arguments
    ///
    /// * `user_id` - Numeric user ID, must be positive
    /// * `username` - Username, must not be empty
    /// * `role` - Role name
    ///
    /// # Returns
    ///
    /// * `Ok(TokenPair)` - The generated token pair
    /// * `Err(DomainError)` - Invalid identity or signing failure
    pub fn generate_token_pair(
        &self,
        user_id: i64,
        username: &str,
        role: &str,
    ) -> DomainResult<TokenPair> {
        let access_claims = self.build_claims(user_id, username, role, TokenType::Access)?;
        let refresh_claims = self.build_claims(user_id, username, role, TokenType::Refresh)?;

        access_claims.validate_structure()?;
        refresh_claims.validate_structure()?;

        let access_token = self.encode_jwt(&access_claims)?;
        let refresh_token = self.encode_jwt(&refresh_claims)?;

        debug!(user_id, access_jti = %access_claims.jti, refresh_jti = %refresh_claims.jti, "Issued token pair");

        Ok(TokenPair::new(access_token, refresh_token, &access_claims))
    }

    fn build_claims(
        &self,
        user_id: i64,
        username: &str,
        role: &str,
        token_type: TokenType,
    ) -> DomainResult<Claims> {
        let ttl = match token_type {
            TokenType::Access => self.config.access_token_ttl,
            TokenType::Refresh => self.config.refresh_token_ttl,
        };
        if ttl <= 0 || ttl > MAX_TOKEN_TTL_SECS {
            return Err(DomainError::Configuration {
                message: format!("{} token lifetime out of range: {}s", token_type.as_str(), ttl),
            });
        }
        Ok(Claims::new(
            user_id,
            username,
            role,
            token_type,
            &self.config.issuer,
            &self.config.audience,
            ttl,
        ))
    }

    /// Encodes claims into a JWT
    pub(crate) fn encode_jwt(&self, claims: &Claims) -> DomainResult<String> {
        let header = Header::new(JWT_ALGORITHM);
        encode(&header, claims, self.keys.encoding_key())
            .map_err(|_| DomainError::Token(TokenError::SigningFailed))
    }

    /// Verifies a token of either type and returns its claims
    ///
    /// The header is inspected before any cryptographic work: a token must
    /// have three segments, a decodable header and an RSA-family `alg`.
    /// Verification then uses the service's own public key with RS256
    /// pinned, whatever the header says.
    ///
    /// # Returns
    ///
    /// * `Ok(Claims)` - Signature, time window, issuer, audience and
    ///   structure all check out
    /// * `Err(DomainError::Token(..))` - The reason the token was refused
    pub fn validate_token(&self, token: &str) -> DomainResult<Claims> {
        preflight(token)?;

        let data = decode::<Claims>(token, self.keys.decoding_key(), &self.validation)
            .map_err(|e| DomainError::Token(map_jwt_error(e.kind())))?;

        data.claims.validate_structure()?;
        Ok(data.claims)
    }

    /// Verifies a token and requires it to be an access token
    pub fn validate_access_token(&self, token: &str) -> DomainResult<Claims> {
        self.validate_typed(token, TokenType::Access)
    }

    /// Verifies a token and requires it to be a refresh token
    pub fn validate_refresh_token(&self, token: &str) -> DomainResult<Claims> {
        self.validate_typed(token, TokenType::Refresh)
    }

    fn validate_typed(&self, token: &str, expected: TokenType) -> DomainResult<Claims> {
        let claims = self.validate_token(token)?;
        let actual = claims.kind()?;
        if actual != expected {
            return Err(TokenError::WrongType { expected, actual }.into());
        }
        Ok(claims)
    }

    /// Exchanges a refresh token for a new token pair
    ///
    /// With rotation enabled the old refresh token's JTI is recorded as used
    /// for the rest of its lifetime, so presenting it again fails with
    /// `TokenError::Revoked`. Any store failure on this path fails the
    /// refresh.
    ///
    /// # Returns
    ///
    /// * `Ok(TokenPair)` - New pair for the identity in the refresh token
    /// * `Err(DomainError)` - Invalid, reused or revoked refresh token, or
    ///   store unavailable
    pub async fn refresh_token_pair(&self, refresh_token: &str) -> DomainResult<TokenPair> {
        let claims = self.validate_refresh_token(refresh_token)?;
        let ttl = remaining_ttl(&claims);

        if self.config.rotate_refresh_tokens {
            let first_use = self
                .bounded("record_once", self.store.record_once(&claims.jti, ttl))
                .await?;
            if !first_use {
                warn!(jti = %claims.jti, user_id = claims.uid, "Refresh token reuse rejected");
                return Err(TokenError::Revoked.into());
            }
        } else if self.is_token_revoked(&claims.jti).await? {
            return Err(TokenError::Revoked.into());
        }

        self.generate_token_pair(claims.uid, &claims.username, &claims.role)
    }

    /// Revokes a token by recording its JTI
    ///
    /// The token must carry a valid signature. Revoking an already expired
    /// token succeeds without touching the store.
    pub async fn revoke_token(&self, token: &str) -> DomainResult<()> {
        match self.validate_token(token) {
            Ok(claims) => self.revoke_claims(&claims).await,
            Err(DomainError::Token(TokenError::Expired)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Revokes already-verified claims
    pub async fn revoke_claims(&self, claims: &Claims) -> DomainResult<()> {
        if claims.remaining_ttl() <= 0 {
            return Ok(());
        }
        self.bounded("set", self.store.set(&claims.jti, remaining_ttl(claims)))
            .await?;
        debug!(jti = %claims.jti, "Token revoked");
        Ok(())
    }

    /// Checks the revocation store for a JTI
    ///
    /// # Returns
    ///
    /// * `Ok(bool)` - Whether the JTI is revoked
    /// * `Err(TokenError::RevocationStoreUnavailable)` - Store failed or
    ///   did not answer within the configured timeout
    pub async fn is_token_revoked(&self, jti: &str) -> DomainResult<bool> {
        self.bounded("exists", self.store.exists(jti)).await
    }

    /// Whether fewer than `threshold_secs` seconds of lifetime remain
    pub fn is_token_expiring_soon(&self, claims: &Claims, threshold_secs: i64) -> bool {
        claims.exp - Utc::now().timestamp() < threshold_secs
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        match tokio::time::timeout(self.config.revocation_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(operation, error = %e, "Revocation store call failed");
                Err(TokenError::RevocationStoreUnavailable.into())
            }
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.config.revocation_timeout.as_millis() as u64,
                    "Revocation store call timed out"
                );
                Err(TokenError::RevocationStoreUnavailable.into())
            }
        }
    }
}

/// Structural and algorithm checks done before touching the signature
fn preflight(token: &str) -> Result<(), TokenError> {
    let mut segments = token.split('.');
    let header = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(header), Some(_), Some(_), None) => header,
        _ => return Err(TokenError::Malformed),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::Malformed)?;
    let probe: HeaderProbe = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

    if !RSA_FAMILY.contains(&probe.alg.as_str()) {
        return Err(TokenError::SignatureInvalid);
    }
    Ok(())
}

fn map_jwt_error(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::MissingAlgorithm
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::InvalidRsaKey(_) => TokenError::SignatureInvalid,
        ErrorKind::InvalidIssuer => TokenError::claims("issuer mismatch"),
        ErrorKind::InvalidAudience => TokenError::claims("audience mismatch"),
        ErrorKind::InvalidSubject => TokenError::claims("subject mismatch"),
        ErrorKind::MissingRequiredClaim(claim) => {
            TokenError::claims(format!("missing required claim {}", claim))
        }
        _ => TokenError::Malformed,
    }
}

/// Remaining lifetime as a store TTL, never below one second
fn remaining_ttl(claims: &Claims) -> Duration {
    Duration::from_secs(claims.remaining_ttl().max(1) as u64)
}
