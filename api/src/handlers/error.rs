//! Mapping from domain errors to HTTP responses
//!
//! Every failure the API returns goes through [`ApiError`], so status codes,
//! error codes and client-facing messages are decided in one place. The
//! client never sees internal error detail; it is logged instead.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use qd_core::domain::entities::token::TokenType;
use qd_core::errors::{AuthError, DomainError, TokenError};
use qd_shared::errors::{error_codes, ErrorResponse};

/// Error returned by middleware and handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Request body failed validation
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl ApiError {
    /// Error code and client-facing message
    fn code_and_message(&self) -> (&'static str, String) {
        match self {
            ApiError::Domain(DomainError::Token(err)) => token_code_and_message(err),
            ApiError::Domain(DomainError::Auth(err)) => auth_code_and_message(err),
            ApiError::Domain(DomainError::Configuration { .. } | DomainError::Internal { .. }) => {
                (error_codes::INTERNAL_ERROR, "Internal server error".into())
            }
            ApiError::Validation(message) => (error_codes::VALIDATION_ERROR, message.clone()),
        }
    }

    /// The envelope sent to the client
    pub fn to_error_response(&self) -> ErrorResponse {
        let (code, message) = self.code_and_message();
        let response = ErrorResponse::new(code, message);

        match self {
            ApiError::Domain(DomainError::Auth(AuthError::InsufficientPermissions {
                required,
                actual,
            })) => response
                .add_detail("required_roles", required)
                .add_detail("actual_role", actual),
            ApiError::Domain(DomainError::Auth(AuthError::RateLimitExceeded { retry_after })) => {
                response.add_detail("retry_after", retry_after)
            }
            _ => response,
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::Domain(DomainError::Auth(AuthError::RateLimitExceeded { retry_after })) => {
                Some(*retry_after)
            }
            _ => None,
        }
    }
}

fn token_code_and_message(err: &TokenError) -> (&'static str, String) {
    match err {
        TokenError::Malformed
        | TokenError::SignatureInvalid
        | TokenError::ClaimsInvalid { .. } => (error_codes::INVALID_TOKEN, "Invalid token".into()),
        TokenError::Expired => (error_codes::INVALID_TOKEN, "Token has expired".into()),
        TokenError::NotYetValid => (error_codes::INVALID_TOKEN, "Token is not yet valid".into()),
        TokenError::WrongType { expected, .. } => {
            let message = match expected {
                TokenType::Access => "Token is not an access token",
                TokenType::Refresh => "Token is not a refresh token",
            };
            (error_codes::INVALID_TOKEN, message.into())
        }
        TokenError::Revoked => (error_codes::TOKEN_REVOKED, "Token has been revoked".into()),
        TokenError::RevocationStoreUnavailable => (
            error_codes::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable".into(),
        ),
        TokenError::KeyUnavailable { .. } | TokenError::SigningFailed => {
            (error_codes::INTERNAL_ERROR, "Internal server error".into())
        }
    }
}

fn auth_code_and_message(err: &AuthError) -> (&'static str, String) {
    match err {
        AuthError::MissingAuthHeader => (
            error_codes::MISSING_AUTH_HEADER,
            "Missing or invalid Authorization header".into(),
        ),
        AuthError::MissingRole => (error_codes::MISSING_ROLE, "Authentication required".into()),
        AuthError::InsufficientPermissions { .. } => (
            error_codes::INSUFFICIENT_PERMISSIONS,
            "Insufficient permissions".into(),
        ),
        AuthError::RateLimitExceeded { .. } => (
            error_codes::RATE_LIMIT_EXCEEDED,
            "Too many requests".into(),
        ),
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Domain(DomainError::Token(err)) => match err {
                TokenError::RevocationStoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                TokenError::KeyUnavailable { .. } | TokenError::SigningFailed => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::UNAUTHORIZED,
            },
            ApiError::Domain(DomainError::Auth(err)) => match err {
                AuthError::MissingAuthHeader | AuthError::MissingRole => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
                AuthError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            },
            ApiError::Domain(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let mut builder = HttpResponse::build(status);
        if let Some(retry_after) = self.retry_after() {
            builder.insert_header((header::RETRY_AFTER, retry_after.to_string()));
        }
        builder.json(self.to_error_response())
    }
}
