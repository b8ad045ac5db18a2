//! Error types for token handling and request admission
//!
//! The `Display` output of these errors is internal detail meant for logs.
//! The presentation layer decides what a client is told.

use thiserror::Error;

use crate::domain::entities::token::TokenType;

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Signing key unavailable: {message}")]
    KeyUnavailable { message: String },

    #[error("Token signing failed")]
    SigningFailed,

    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature or algorithm")]
    SignatureInvalid,

    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid")]
    NotYetValid,

    #[error("Invalid claims: {reason}")]
    ClaimsInvalid { reason: String },

    #[error("Wrong token type: expected {expected}, got {actual}")]
    WrongType { expected: TokenType, actual: TokenType },

    #[error("Token revoked")]
    Revoked,

    #[error("Revocation store unavailable")]
    RevocationStoreUnavailable,
}

impl TokenError {
    pub(crate) fn claims(reason: impl Into<String>) -> Self {
        TokenError::ClaimsInvalid {
            reason: reason.into(),
        }
    }
}

/// Authentication and admission errors raised by the request chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing or malformed Authorization header")]
    MissingAuthHeader,

    #[error("No role in request context")]
    MissingRole,

    #[error("Role {actual:?} not in {required:?}")]
    InsufficientPermissions {
        required: Vec<String>,
        actual: String,
    },

    #[error("Rate limit exceeded, retry after {retry_after}s")]
    RateLimitExceeded { retry_after: u64 },
}
