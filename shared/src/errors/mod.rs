//! Shared error envelope and error codes

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Standard error response structure used across all API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for client identification
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create an error response with details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    /// Add a detail field to the error response
    pub fn add_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let details = self.details.get_or_insert_with(HashMap::new);
        if let Ok(json_value) = serde_json::to_value(value) {
            details.insert(key.into(), json_value);
        }
        self
    }
}

/// Error codes carried in the `code` field
pub mod error_codes {
    pub const MISSING_AUTH_HEADER: &str = "MISSING_AUTH_HEADER";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const TOKEN_REVOKED: &str = "TOKEN_REVOKED";
    pub const MISSING_ROLE: &str = "MISSING_ROLE";
    pub const INSUFFICIENT_PERMISSIONS: &str = "INSUFFICIENT_PERMISSIONS";
    pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_omitted_when_empty() {
        let body = serde_json::to_value(ErrorResponse::new(error_codes::INVALID_TOKEN, "Invalid token"))
            .unwrap();
        assert_eq!(body["code"], "INVALID_TOKEN");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_add_detail() {
        let response = ErrorResponse::new(error_codes::RATE_LIMIT_EXCEEDED, "Too many requests")
            .add_detail("retry_after", 3u64);
        let details = response.details.unwrap();
        assert_eq!(details["retry_after"], serde_json::json!(3));
    }
}
