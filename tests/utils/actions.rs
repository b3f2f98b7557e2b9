use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Map, Value};
use tower::ServiceExt; // for `oneshot`

use super::setup::TestSetup;

/// Status and decoded JSON body of a finished request
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Send a request through the router and decode the JSON reply
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(authorization) = authorization {
            builder = builder.header("authorization", authorization);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse { status, body }
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    pub async fn list_students(&self) -> TestResponse {
        self.send("GET", "/alunos", Some(&self.bearer()), None).await
    }

    pub async fn get_student(&self, id: i32) -> TestResponse {
        let uri = format!("/alunos/{}", id);
        self.send("GET", &uri, Some(&self.bearer()), None).await
    }

    pub async fn create_student(&self, payload: Map<String, Value>) -> TestResponse {
        self.send(
            "POST",
            "/alunos",
            Some(&self.bearer()),
            Some(Value::Object(payload)),
        )
        .await
    }

    pub async fn update_student(&self, id: i32, payload: Map<String, Value>) -> TestResponse {
        let uri = format!("/alunos/{}", id);
        self.send("PUT", &uri, Some(&self.bearer()), Some(Value::Object(payload)))
            .await
    }

    pub async fn delete_student(&self, id: i32) -> TestResponse {
        let uri = format!("/alunos/{}", id);
        self.send("DELETE", &uri, Some(&self.bearer()), None).await
    }

    pub async fn list_birthdays(&self) -> TestResponse {
        self.send("GET", "/alunos/aniversariantes", Some(&self.bearer()), None)
            .await
    }

    // ============================================================================
    // Account Actions
    // ============================================================================

    #[allow(dead_code)]
    pub async fn register_user(&self, payload: Value) -> TestResponse {
        self.send("POST", "/users/create", None, Some(payload)).await
    }

    /// Log in and return the bearer header built from the minted token
    #[allow(dead_code)]
    pub async fn login_as(&self, email: &str, password: &str) -> TestResponse {
        self.send(
            "POST",
            "/users/login",
            None,
            Some(serde_json::json!({ "email": email, "password": password })),
        )
        .await
    }
}
