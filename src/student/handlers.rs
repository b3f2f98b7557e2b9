use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::service::StudentService;
use crate::{
    auth::Authorization, shared::AppError, shared::AppState, validation::INVALID_PAYLOAD,
};

type StudentId = Result<Path<i32>, PathRejection>;
type StudentBody = Result<Json<Map<String, Value>>, JsonRejection>;

fn student_service(state: &AppState) -> StudentService {
    StudentService::new(
        Arc::clone(&state.student_repository),
        Arc::clone(&state.token_verifier),
    )
}

/// Unparsable ids fall through to the service as "no such student"
fn parse_id(id: StudentId) -> Option<i32> {
    id.map(|Path(id)| id)
        .map_err(|e| warn!(error = %e, "Student id could not be parsed"))
        .ok()
}

/// GET /alunos
#[instrument(name = "list_students", skip(state, auth))]
pub async fn list_students(State(state): State<AppState>, auth: Authorization) -> Response {
    info!("Listing students");
    student_service(&state).list(&auth).await.into_response()
}

/// GET /alunos/:id
#[instrument(name = "get_student", skip(state, auth, id))]
pub async fn get_student(
    State(state): State<AppState>,
    auth: Authorization,
    id: StudentId,
) -> Response {
    let id = parse_id(id);
    info!(student_id = ?id, "Fetching student");
    student_service(&state).get(&auth, id).await.into_response()
}

/// POST /alunos
///
/// Returns 201 with a confirmation message on success
#[instrument(name = "create_student", skip(state, auth, body))]
pub async fn create_student(
    State(state): State<AppState>,
    auth: Authorization,
    body: StudentBody,
) -> Response {
    let service = student_service(&state);
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => {
            info!(error = %e, "Create request body could not be read");
            return service
                .reject::<String>(&auth, AppError::Validation(INVALID_PAYLOAD.to_string()))
                .into_response();
        }
    };

    info!(field_count = body.len(), "Creating student");
    service
        .create(&auth, &body)
        .await
        .into_response_with(StatusCode::CREATED)
}

/// PUT /alunos/:id
#[instrument(name = "update_student", skip(state, auth, id, body))]
pub async fn update_student(
    State(state): State<AppState>,
    auth: Authorization,
    id: StudentId,
    body: StudentBody,
) -> Response {
    let service = student_service(&state);
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => {
            info!(error = %e, "Update request body could not be read");
            return service
                .reject::<String>(&auth, AppError::Validation(INVALID_PAYLOAD.to_string()))
                .into_response();
        }
    };

    let id = parse_id(id);
    info!(student_id = ?id, "Updating student");
    service.update(&auth, &body, id).await.into_response()
}

/// DELETE /alunos/:id
#[instrument(name = "delete_student", skip(state, auth, id))]
pub async fn delete_student(
    State(state): State<AppState>,
    auth: Authorization,
    id: StudentId,
) -> Response {
    let id = parse_id(id);
    info!(student_id = ?id, "Deleting student");
    student_service(&state).delete(&auth, id).await.into_response()
}

/// GET /alunos/aniversariantes
#[instrument(name = "list_birthdays", skip(state, auth))]
pub async fn list_birthdays(State(state): State<AppState>, auth: Authorization) -> Response {
    info!("Listing birthdays of the week");
    student_service(&state).birthdays(&auth).await.into_response()
}
