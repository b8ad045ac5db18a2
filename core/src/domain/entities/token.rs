//! Token entities for JWT-based authentication.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use qd_shared::config::MAX_TOKEN_TTL_SECS;

use crate::errors::TokenError;

/// Default access token lifetime (1 hour)
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// Default refresh token lifetime (24 hours)
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 86400;

/// Default JWT issuer
pub const JWT_ISSUER: &str = "querydesk";

/// Default JWT audience
pub const JWT_AUDIENCE: &str = "querydesk-api";

/// Kind of token, carried in the `token_type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenType::Access),
            "refresh" => Ok(TokenType::Refresh),
            other => Err(TokenError::claims(format!("unknown token_type {:?}", other))),
        }
    }
}

/// Claims structure for JWT payload
///
/// Identity fields default when absent from a decoded payload so that a
/// token missing them fails [`Claims::validate_structure`] rather than
/// failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric user ID
    #[serde(default)]
    pub uid: i64,

    /// Username
    #[serde(default)]
    pub username: String,

    /// Role name
    #[serde(default)]
    pub role: String,

    /// "access" or "refresh"
    #[serde(default)]
    pub token_type: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Subject (decimal user ID)
    pub sub: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Not before timestamp
    pub nbf: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,

    /// JWT ID (unique identifier for the token)
    #[serde(default)]
    pub jti: String,
}

impl Claims {
    /// Creates claims valid from `now` for `ttl_secs` seconds
    ///
    /// # Arguments
    ///
    /// * `user_id` - Numeric user ID
    /// * `username` - Username
    /// * `role` - Role name
    /// * `token_type` - Access or refresh
    /// * `issuer` / `audience` - Values pinned by the verifier
    /// * `ttl_secs` - Lifetime in seconds, clamped to `0..=MAX_TOKEN_TTL_SECS`
    ///
    /// # Returns
    ///
    /// A new `Claims` instance with a fresh random JTI
    pub fn new(
        user_id: i64,
        username: &str,
        role: &str,
        token_type: TokenType,
        issuer: &str,
        audience: &str,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now();
        let expiry = now + Duration::seconds(ttl_secs.clamp(0, MAX_TOKEN_TTL_SECS));

        Self {
            uid: user_id,
            username: username.to_string(),
            role: role.to_string(),
            token_type: token_type.as_str().to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            sub: user_id.to_string(),
            exp: expiry.timestamp(),
            nbf: now.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Parsed token type
    ///
    /// # Returns
    ///
    /// `Err(TokenError::ClaimsInvalid)` if the claim is not a known type
    pub fn kind(&self) -> Result<TokenType, TokenError> {
        self.token_type.parse()
    }

    /// Checks the identity fields every token must carry
    pub fn validate_structure(&self) -> Result<(), TokenError> {
        if self.uid <= 0 {
            return Err(TokenError::claims("uid must be positive"));
        }
        if self.username.trim().is_empty() {
            return Err(TokenError::claims("username must not be empty"));
        }
        if self.jti.is_empty() {
            return Err(TokenError::claims("jti must not be empty"));
        }
        self.kind()?;
        Ok(())
    }

    /// Seconds left until expiry, negative once expired
    pub fn remaining_ttl(&self) -> i64 {
        self.exp - Utc::now().timestamp()
    }

    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Expiry as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Token pair returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// JWT refresh token
    pub refresh_token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    /// Access token expiry (RFC 3339 on the wire)
    pub expires_at: DateTime<Utc>,
}

impl TokenPair {
    /// Creates a new token pair
    ///
    /// # Arguments
    ///
    /// * `access_token` - The signed access token
    /// * `refresh_token` - The signed refresh token
    /// * `access_claims` - Claims of the access token, for the expiry fields
    pub fn new(access_token: String, refresh_token: String, access_claims: &Claims) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: String::from("Bearer"),
            expires_in: access_claims.exp - access_claims.iat,
            expires_at: access_claims.expires_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access_claims() -> Claims {
        Claims::new(123, "alice", "user", TokenType::Access, JWT_ISSUER, JWT_AUDIENCE, 3600)
    }

    #[test]
    fn test_access_token_claims() {
        let claims = access_claims();

        assert_eq!(claims.uid, 123);
        assert_eq!(claims.sub, "123");
        assert_eq!(claims.iss, JWT_ISSUER);
        assert_eq!(claims.aud, JWT_AUDIENCE);
        assert_eq!(claims.kind().unwrap(), TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(claims.validate_structure().is_ok());
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_huge_lifetime_is_clamped() {
        let claims = Claims::new(1, "a", "user", TokenType::Refresh, JWT_ISSUER, JWT_AUDIENCE, i64::MAX);
        assert_eq!(claims.exp - claims.iat, MAX_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_jti_is_unique() {
        let a = access_claims();
        let b = access_claims();
        assert_ne!(a.jti, b.jti);
        assert!(Uuid::parse_str(&a.jti).is_ok());
    }

    #[test]
    fn test_structure_rejects_bad_identity() {
        let mut claims = access_claims();
        claims.uid = 0;
        assert!(matches!(claims.validate_structure(), Err(TokenError::ClaimsInvalid { .. })));

        let mut claims = access_claims();
        claims.username = "  ".to_string();
        assert!(claims.validate_structure().is_err());

        let mut claims = access_claims();
        claims.jti.clear();
        assert!(claims.validate_structure().is_err());

        let mut claims = access_claims();
        claims.token_type = "session".to_string();
        assert!(claims.validate_structure().is_err());
    }

    #[test]
    fn test_missing_identity_fields_deserialize_to_defaults() {
        let json = r#"{"iss":"querydesk","aud":"querydesk-api","sub":"1","exp":10,"nbf":0}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();

        assert_eq!(claims.uid, 0);
        assert!(claims.username.is_empty());
        assert!(claims.validate_structure().is_err());
    }

    #[test]
    fn test_token_type_parsing() {
        assert_eq!("refresh".parse::<TokenType>().unwrap(), TokenType::Refresh);
        assert!("Access".parse::<TokenType>().is_err());
        assert_eq!(TokenType::Access.to_string(), "access");
    }

    #[test]
    fn test_token_pair_creation() {
        let claims = access_claims();
        let pair = TokenPair::new("a".to_string(), "r".to_string(), &claims);

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);
        assert_eq!(pair.expires_at.timestamp(), claims.exp);

        let json = serde_json::to_value(&pair).unwrap();
        assert!(json["expires_at"].as_str().unwrap().contains('T'));
    }
}
