use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::service::UserService;
use crate::{
    auth::Authorization, response::ServiceResponse, shared::AppError, shared::AppState,
    validation::INVALID_PAYLOAD,
};

type UserBody = Result<Json<Map<String, Value>>, JsonRejection>;

fn user_service(state: &AppState) -> UserService {
    UserService::new(
        Arc::clone(&state.user_repository),
        state.token_config.clone(),
        Arc::clone(&state.token_verifier),
    )
}

fn unreadable_body() -> AppError {
    AppError::Validation(INVALID_PAYLOAD.to_string())
}

/// POST /users/create
#[instrument(name = "create_user", skip(state, body))]
pub async fn create_user(State(state): State<AppState>, body: UserBody) -> Response {
    let Ok(Json(body)) = body else {
        info!("Registration body could not be read");
        return ServiceResponse::<String>::from(unreadable_body()).into_response();
    };

    info!("Registering user");
    user_service(&state)
        .create(&body)
        .await
        .into_response_with(StatusCode::CREATED)
}

/// POST /users/login
#[instrument(name = "login", skip(state, body))]
pub async fn login(State(state): State<AppState>, body: UserBody) -> Response {
    let Ok(Json(body)) = body else {
        info!("Login body could not be read");
        return ServiceResponse::<String>::from(unreadable_body()).into_response();
    };

    info!("Logging in");
    user_service(&state).login(&body).await.into_response()
}

/// GET /users/fetch
#[instrument(name = "fetch_user", skip(state, auth))]
pub async fn fetch_user(State(state): State<AppState>, auth: Authorization) -> Response {
    info!("Fetching logged in user");
    user_service(&state).fetch(&auth).await.into_response()
}

/// PUT /users/update
#[instrument(name = "update_user", skip(state, auth, body))]
pub async fn update_user(
    State(state): State<AppState>,
    auth: Authorization,
    body: UserBody,
) -> Response {
    let service = user_service(&state);
    let Ok(Json(body)) = body else {
        info!("Update body could not be read");
        return service
            .reject::<String>(&auth, unreadable_body())
            .into_response();
    };

    info!("Updating logged in user");
    service.update(&auth, &body).await.into_response()
}

/// DELETE /users/:id/delete
#[instrument(name = "remove_user", skip(state, auth, id))]
pub async fn remove_user(
    State(state): State<AppState>,
    auth: Authorization,
    id: Result<Path<i32>, PathRejection>,
) -> Response {
    let id = id
        .map(|Path(id)| id)
        .map_err(|e| warn!(error = %e, "User id could not be parsed"))
        .ok();
    info!(user_id = ?id, "Removing user");
    user_service(&state).remove(&auth, id).await.into_response()
}

#[cfg(test)]
mod tests {
    use crate::auth::MISSING_TOKEN;
    use crate::routes::app;
    use crate::shared::test_utils::AppStateBuilder;
    use crate::user::models::fixtures::{account_payload, login_payload};
    use crate::user::repository::InMemoryUserRepository;
    use crate::user::service::{DELETE_FAILED, LOGIN_FAILED, USER_CREATED};
    use crate::validation::INVALID_PAYLOAD;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    fn test_app() -> (Router, Arc<InMemoryUserRepository>) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let state = AppStateBuilder::new()
            .with_user_repository(repo.clone())
            .build();
        (app(state), repo)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_register_login_and_fetch() {
        let (app, repo) = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/users/create",
                Value::Object(account_payload("Ana", "ana@imdaz.org")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await, json!(USER_CREATED));
        assert_eq!(repo.user_count(), 1);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/users/login",
                Value::Object(login_payload("ana@imdaz.org", "s3nha-da-secretaria")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = body_json(response).await["token"]
            .as_str()
            .unwrap()
            .to_string();

        let request = Request::builder()
            .uri("/users/fetch")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["email"], json!("ana@imdaz.org"));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let (app, _repo) = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/users/login",
                Value::Object(login_payload("ana@imdaz.org", "errada")),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"error": LOGIN_FAILED}));
    }

    #[tokio::test]
    async fn test_unreadable_registration_body() {
        let (app, repo) = test_app();

        let request = Request::builder()
            .method("POST")
            .uri("/users/create")
            .body(Body::from("name=Ana"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await, json!({"error": INVALID_PAYLOAD}));
        assert_eq!(repo.user_count(), 0);
    }

    #[tokio::test]
    async fn test_update_without_token_and_bad_body() {
        let (app, _repo) = test_app();

        let response = app
            .oneshot(json_request("PUT", "/users/update", json!([1])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"unauthorized": MISSING_TOKEN}));
    }

    #[tokio::test]
    async fn test_remove_with_unparsable_id() {
        let (app, _repo) = test_app();
        let token = crate::shared::test_utils::test_token_config()
            .create_token("1".to_string(), "Ana".to_string())
            .unwrap();

        let request = Request::builder()
            .method("DELETE")
            .uri("/users/abc/delete")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({"error": DELETE_FAILED}));
    }
}
