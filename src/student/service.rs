use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::{StudentFields, StudentModel},
    repository::StudentRepository,
};
use crate::{
    auth::{Authorization, TokenVerifier, UserClaims},
    response::ServiceResponse,
    shared::AppError,
    validation::Validator,
};

/// Length of the "birthdays of the week" window, today included
pub const BIRTHDAY_WINDOW_DAYS: u32 = 7;

pub const STUDENTS_NOT_FOUND: &str = "Não foi possível encontrar os alunos.";
pub const STUDENT_NOT_FOUND: &str = "Não foi possível encontrar o aluno.";
pub const CREATE_FAILED: &str = "Não foi possível criar o aluno.";
pub const UPDATE_FAILED: &str = "Não foi possível atualizar o aluno.";
pub const DELETE_FAILED: &str = "Não foi possível remover o aluno.";
pub const BIRTHDAYS_NOT_FOUND: &str =
    "Não foi possível encontrar os alunos aniversariantes da semana.";

pub const STUDENT_CREATED: &str = "Aluno criado com sucesso!";
pub const STUDENT_UPDATED: &str = "Aluno atualizado com sucesso.";
pub const STUDENT_DELETED: &str = "Aluno removido com sucesso.";

/// Service for student business logic.
///
/// Every operation verifies the caller first, and only then validates input
/// and touches the repository. Failures never escape as `Err`: they come back
/// as `ServiceResponse::Unauthorized` or `ServiceResponse::Error`.
pub struct StudentService {
    repository: Arc<dyn StudentRepository + Send + Sync>,
    token_verifier: Arc<dyn TokenVerifier + Send + Sync>,
}

impl StudentService {
    pub fn new(
        repository: Arc<dyn StudentRepository + Send + Sync>,
        token_verifier: Arc<dyn TokenVerifier + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            token_verifier,
        }
    }

    /// Lists every student
    #[instrument(skip(self, auth))]
    pub async fn list(&self, auth: &Authorization) -> ServiceResponse<Vec<StudentModel>> {
        self.try_list(auth).await.into()
    }

    /// Fetches one student by id. An id that could not be parsed matches nothing.
    #[instrument(skip(self, auth, id))]
    pub async fn get(
        &self,
        auth: &Authorization,
        id: impl Into<Option<i32>>,
    ) -> ServiceResponse<StudentModel> {
        self.try_get(auth, id.into()).await.into()
    }

    /// Validates the payload and stores a new student
    #[instrument(skip(self, auth, data))]
    pub async fn create(
        &self,
        auth: &Authorization,
        data: &Map<String, Value>,
    ) -> ServiceResponse<String> {
        self.try_create(auth, data).await.into()
    }

    /// Validates the payload and replaces every field of the student
    #[instrument(skip(self, auth, data, id))]
    pub async fn update(
        &self,
        auth: &Authorization,
        data: &Map<String, Value>,
        id: impl Into<Option<i32>>,
    ) -> ServiceResponse<String> {
        self.try_update(auth, data, id.into()).await.into()
    }

    /// Removes a student along with its enrollments
    #[instrument(skip(self, auth, id))]
    pub async fn delete(
        &self,
        auth: &Authorization,
        id: impl Into<Option<i32>>,
    ) -> ServiceResponse<String> {
        self.try_delete(auth, id.into()).await.into()
    }

    /// Lists students whose birthday falls within the coming week
    #[instrument(skip(self, auth))]
    pub async fn birthdays(&self, auth: &Authorization) -> ServiceResponse<Vec<StudentModel>> {
        self.try_birthdays(auth).await.into()
    }

    /// Answers a request whose body could not be read, once the caller is authorized
    pub fn reject<T>(&self, auth: &Authorization, error: AppError) -> ServiceResponse<T> {
        let result: Result<T, AppError> = self.authorize(auth).and_then(|_| {
            warn!(error = %error, "Rejecting unreadable request");
            Err(error)
        });
        result.into()
    }

    fn authorize(&self, auth: &Authorization) -> Result<UserClaims, AppError> {
        auth.authorize(self.token_verifier.as_ref())
    }

    fn validate(data: &Map<String, Value>) -> Result<StudentFields, AppError> {
        let fields = Validator::validate(data, &StudentFields::schema())?;
        StudentFields::from_validated(fields)
    }

    async fn try_list(&self, auth: &Authorization) -> Result<Vec<StudentModel>, AppError> {
        let claims = self.authorize(auth)?;

        let students = self.repository.list_students().await?;
        if students.is_empty() {
            return Err(AppError::NotFound(STUDENTS_NOT_FOUND.to_string()));
        }

        info!(user_id = %claims.sub, count = students.len(), "Students listed");
        Ok(students)
    }

    async fn try_get(
        &self,
        auth: &Authorization,
        id: Option<i32>,
    ) -> Result<StudentModel, AppError> {
        let claims = self.authorize(auth)?;
        let not_found = || AppError::NotFound(STUDENT_NOT_FOUND.to_string());
        let id = id.ok_or_else(not_found)?;

        let student = self
            .repository
            .get_student(id)
            .await?
            .ok_or_else(not_found)?;

        info!(user_id = %claims.sub, student_id = id, "Student fetched");
        Ok(student)
    }

    async fn try_create(
        &self,
        auth: &Authorization,
        data: &Map<String, Value>,
    ) -> Result<String, AppError> {
        let claims = self.authorize(auth)?;
        let fields = Self::validate(data)?;

        let student = self
            .repository
            .create_student(&fields)
            .await?
            .ok_or_else(|| AppError::OperationFailed(CREATE_FAILED.to_string()))?;

        info!(user_id = %claims.sub, student_id = student.id, "Student created");
        Ok(STUDENT_CREATED.to_string())
    }

    async fn try_update(
        &self,
        auth: &Authorization,
        data: &Map<String, Value>,
        id: Option<i32>,
    ) -> Result<String, AppError> {
        let claims = self.authorize(auth)?;
        let fields = Self::validate(data)?;
        let id = id.ok_or_else(|| AppError::NotFound(UPDATE_FAILED.to_string()))?;

        self.repository
            .update_student(id, &fields)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotFound(UPDATE_FAILED.to_string()),
                other => other,
            })?;

        info!(user_id = %claims.sub, student_id = id, "Student updated");
        Ok(STUDENT_UPDATED.to_string())
    }

    async fn try_delete(&self, auth: &Authorization, id: Option<i32>) -> Result<String, AppError> {
        let claims = self.authorize(auth)?;
        let id = id.ok_or_else(|| AppError::NotFound(DELETE_FAILED.to_string()))?;

        self.repository
            .delete_student(id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotFound(DELETE_FAILED.to_string()),
                other => other,
            })?;

        info!(user_id = %claims.sub, student_id = id, "Student deleted");
        Ok(STUDENT_DELETED.to_string())
    }

    async fn try_birthdays(&self, auth: &Authorization) -> Result<Vec<StudentModel>, AppError> {
        let claims = self.authorize(auth)?;
        let today = Utc::now().date_naive();

        let students = self
            .repository
            .list_birthdays(today, BIRTHDAY_WINDOW_DAYS)
            .await?;
        if students.is_empty() {
            return Err(AppError::NotFound(BIRTHDAYS_NOT_FOUND.to_string()));
        }

        info!(user_id = %claims.sub, count = students.len(), "Birthdays listed");
        Ok(students)
    }
}
