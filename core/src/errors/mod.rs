//! Domain-specific error types and error handling.

mod types;


pub use types::{AuthError, TokenError};

use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl DomainError {
    /// Returns the token error if this is one
    pub fn as_token_error(&self) -> Option<&TokenError> {
        match self {
            DomainError::Token(e) => Some(e),
            _ => None,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
