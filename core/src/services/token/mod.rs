//! Token service module for JWT management
//!
//! This module handles all token-related operations including:
//! - RS256 key loading, generation and persistence
//! - Access and refresh token issuance and verification
//! - Refresh token rotation and JTI revocation

mod config;
mod key_manager;
mod service;

#[cfg(test)]
mod tests;

pub use config::TokenServiceConfig;
pub use key_manager::{KeyManager, KeySource, GENERATED_KEY_BITS};
pub use service::{TokenService, JWT_ALGORITHM};
