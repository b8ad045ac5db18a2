//! Domain entities representing core business objects.

pub mod token;

// Re-export commonly used types
pub use token::{
    Claims, TokenPair, TokenType,
    DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS,
    JWT_AUDIENCE, JWT_ISSUER,
};
