// Route table: HTTP verbs and paths mapped to handler actions

use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::shared::AppState;
use crate::student;
use crate::user;

async fn home() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the application router with tracing and CORS layers
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/users/create", post(user::create_user))
        .route("/users/login", post(user::login))
        .route("/users/fetch", get(user::fetch_user))
        .route("/users/update", put(user::update_user))
        .route("/users/:id/delete", delete(user::remove_user))
        .route(
            "/alunos",
            get(student::list_students).post(student::create_student),
        )
        .route("/alunos/aniversariantes", get(student::list_birthdays))
        .route(
            "/alunos/:id",
            get(student::get_student)
                .put(student::update_student)
                .delete(student::delete_student),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
