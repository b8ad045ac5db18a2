//! Error mapping shared by handlers and middleware

pub mod error;

pub use error::ApiError;
