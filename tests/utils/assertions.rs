//! Test assertion helpers - fluent API for verifying responses
#![allow(dead_code)] // Test utilities may not all be used in every test

use axum::http::StatusCode;
use serde_json::{json, Value};

use super::actions::TestResponse;

// ============================================================================
// Assertion Helpers
// ============================================================================

impl TestResponse {
    /// Assert a success reply and return its payload
    pub fn expect_success(self, status: StatusCode) -> Value {
        assert_eq!(self.status, status, "unexpected status, body: {}", self.body);
        assert!(
            self.body.get("error").is_none() && self.body.get("unauthorized").is_none(),
            "expected a success payload, got {}",
            self.body
        );
        self.body
    }

    /// Assert an `{"error": message}` reply
    pub fn expect_error(self, status: StatusCode, message: &str) {
        assert_eq!(self.status, status, "unexpected status, body: {}", self.body);
        assert_eq!(self.body, json!({ "error": message }));
    }

    /// Assert an `{"unauthorized": message}` reply
    pub fn expect_unauthorized(self, message: &str) {
        assert_eq!(self.status, StatusCode::UNAUTHORIZED);
        assert_eq!(self.body, json!({ "unauthorized": message }));
    }
}

/// Names of the students in a list payload, in order
pub fn names(body: &Value) -> Vec<String> {
    body.as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|s| s["nome"].as_str().unwrap_or_default().to_string())
        .collect()
}
