use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::{LoginRequest, LoginResponse, UserAccount, UserModel},
    password::{hash_password, verify_password},
    repository::UserRepository,
};
use crate::{
    auth::{Authorization, TokenConfig, TokenVerifier, UserClaims, LOGIN_REQUIRED},
    response::ServiceResponse,
    shared::AppError,
    validation::Validator,
};

pub const USER_CREATED: &str = "Usuário criado com sucesso!";
pub const USER_UPDATED: &str = "Usuário atualizado com sucesso.";
pub const USER_DELETED: &str = "Usuário removido com sucesso.";

pub const CREATE_FAILED: &str = "Não foi possível criar o usuário.";
pub const EMAIL_TAKEN: &str = "Já existe um usuário cadastrado com esse e-mail.";
pub const LOGIN_FAILED: &str = "E-mail ou senha inválidos.";
pub const USER_NOT_FOUND: &str = "Não foi possível encontrar o usuário.";
pub const UPDATE_FAILED: &str = "Não foi possível atualizar o usuário.";
pub const DELETE_FAILED: &str = "Não foi possível remover o usuário.";

/// Registration, login and self-service for staff accounts.
///
/// `create` and `login` are open; everything else requires a token minted by `login`.
pub struct UserService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    token_config: TokenConfig,
    token_verifier: Arc<dyn TokenVerifier + Send + Sync>,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository + Send + Sync>,
        token_config: TokenConfig,
        token_verifier: Arc<dyn TokenVerifier + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            token_config,
            token_verifier,
        }
    }

    /// Registers a new account
    #[instrument(skip(self, data))]
    pub async fn create(&self, data: &Map<String, Value>) -> ServiceResponse<String> {
        self.try_create(data).await.into()
    }

    /// Exchanges email and password for a bearer token
    #[instrument(skip(self, data))]
    pub async fn login(&self, data: &Map<String, Value>) -> ServiceResponse<LoginResponse> {
        self.try_login(data).await.into()
    }

    /// Returns the account the token was issued for
    #[instrument(skip(self, auth))]
    pub async fn fetch(&self, auth: &Authorization) -> ServiceResponse<UserModel> {
        self.try_fetch(auth).await.into()
    }

    /// Replaces name, email and password of the logged in account
    #[instrument(skip(self, auth, data))]
    pub async fn update(
        &self,
        auth: &Authorization,
        data: &Map<String, Value>,
    ) -> ServiceResponse<String> {
        self.try_update(auth, data).await.into()
    }

    /// Removes an account by id
    #[instrument(skip(self, auth, id))]
    pub async fn remove(
        &self,
        auth: &Authorization,
        id: impl Into<Option<i32>>,
    ) -> ServiceResponse<String> {
        self.try_remove(auth, id.into()).await.into()
    }

    /// Answers a request whose body could not be read, once the caller is authorized
    pub fn reject<T>(&self, auth: &Authorization, error: AppError) -> ServiceResponse<T> {
        let result: Result<T, AppError> = auth
            .authorize(self.token_verifier.as_ref())
            .and_then(|_| Err(error));
        result.into()
    }

    /// The token subject carries the user id
    fn authorize(&self, auth: &Authorization) -> Result<(i32, UserClaims), AppError> {
        let claims = auth.authorize(self.token_verifier.as_ref())?;
        let id = claims.sub.parse::<i32>().map_err(|_| {
            warn!(sub = %claims.sub, "Token subject is not a user id");
            AppError::Unauthorized(LOGIN_REQUIRED.to_string())
        })?;
        Ok((id, claims))
    }

    /// Validates the payload and swaps the plain password for its hash
    fn validate_account(data: &Map<String, Value>) -> Result<UserAccount, AppError> {
        let fields = Validator::validate(data, &UserAccount::schema())?;
        let mut account = UserAccount::from_validated(fields)?;
        account.password = hash_password(&account.password);
        Ok(account)
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<i32>) -> Result<(), AppError> {
        match self.repository.find_user_by_email(email).await? {
            Some(existing) if Some(existing.id) != owner => {
                warn!(user_id = existing.id, "Email already registered");
                Err(AppError::OperationFailed(EMAIL_TAKEN.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn try_create(&self, data: &Map<String, Value>) -> Result<String, AppError> {
        let account = Self::validate_account(data)?;
        self.ensure_email_free(&account.email, None).await?;

        let user = self
            .repository
            .create_user(&account)
            .await?
            .ok_or_else(|| AppError::OperationFailed(CREATE_FAILED.to_string()))?;

        info!(user_id = user.id, "User created");
        Ok(USER_CREATED.to_string())
    }

    async fn try_login(&self, data: &Map<String, Value>) -> Result<LoginResponse, AppError> {
        let fields = Validator::validate(data, &LoginRequest::schema())?;
        let request = LoginRequest::from_validated(fields)?;

        let user = self
            .repository
            .find_user_by_email(&request.email)
            .await?
            .filter(|user| verify_password(&request.password, &user.password))
            .ok_or_else(|| {
                warn!("Login rejected");
                AppError::InvalidCredentials(LOGIN_FAILED.to_string())
            })?;

        let token = self
            .token_config
            .create_token(user.id.to_string(), user.name.clone())?;

        info!(user_id = user.id, "User logged in");
        Ok(LoginResponse { token })
    }

    async fn try_fetch(&self, auth: &Authorization) -> Result<UserModel, AppError> {
        let (id, _claims) = self.authorize(auth)?;

        self.repository
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))
    }

    async fn try_update(
        &self,
        auth: &Authorization,
        data: &Map<String, Value>,
    ) -> Result<String, AppError> {
        let (id, _claims) = self.authorize(auth)?;
        let account = Self::validate_account(data)?;
        self.ensure_email_free(&account.email, Some(id)).await?;

        self.repository
            .update_user(id, &account)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotFound(UPDATE_FAILED.to_string()),
                other => other,
            })?;

        info!(user_id = id, "User updated");
        Ok(USER_UPDATED.to_string())
    }

    async fn try_remove(&self, auth: &Authorization, id: Option<i32>) -> Result<String, AppError> {
        let (caller, _claims) = self.authorize(auth)?;
        let id = id.ok_or_else(|| AppError::NotFound(DELETE_FAILED.to_string()))?;

        self.repository
            .delete_user(id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotFound(DELETE_FAILED.to_string()),
                other => other,
            })?;

        info!(user_id = id, removed_by = caller, "User removed");
        Ok(USER_DELETED.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtTokenVerifier, MISSING_TOKEN};
    use crate::shared::test_utils::test_token_config;
    use crate::user::models::fixtures::{account_payload, login_payload};
    use crate::user::repository::InMemoryUserRepository;
    use rstest::rstest;
    use serde_json::json;

    fn user_service() -> (UserService, Arc<InMemoryUserRepository>) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = UserService::new(
            repo.clone(),
            test_token_config(),
            Arc::new(JwtTokenVerifier::new(test_token_config())),
        );
        (service, repo)
    }

    fn to_json<T: serde::Serialize>(response: &ServiceResponse<T>) -> Value {
        serde_json::to_value(response).unwrap()
    }

    /// Registers Ana and logs in, returning her bearer credential
    async fn logged_in(service: &UserService) -> Authorization {
        service
            .create(&account_payload("Ana", "ana@imdaz.org"))
            .await;
        let login = service
            .login(&login_payload("ana@imdaz.org", "s3nha-da-secretaria"))
            .await
            .success()
            .unwrap();
        Authorization::bearer(login.token)
    }

    #[tokio::test]
    async fn test_create_hashes_password() {
        let (service, repo) = user_service();

        let response = service
            .create(&account_payload("Ana", "Ana@IMDAZ.org"))
            .await;
        assert_eq!(to_json(&response), json!(USER_CREATED));

        let stored = repo.get_user(1).await.unwrap().unwrap();
        assert_eq!(stored.email, "ana@imdaz.org");
        assert_ne!(stored.password, "s3nha-da-secretaria");
        assert!(verify_password("s3nha-da-secretaria", &stored.password));
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let (service, repo) = user_service();
        service
            .create(&account_payload("Ana", "ana@imdaz.org"))
            .await;

        let response = service
            .create(&account_payload("Outra", "ana@imdaz.org"))
            .await;
        assert_eq!(to_json(&response), json!({"error": EMAIL_TAKEN}));
        assert_eq!(repo.user_count(), 1);
    }

    #[tokio::test]
    async fn test_login_token_is_accepted_by_verifier() {
        let (service, _repo) = user_service();
        let auth = logged_in(&service).await;

        let claims = auth
            .authorize(&JwtTokenVerifier::new(test_token_config()))
            .unwrap();
        assert_eq!(claims.sub, "1");
        assert_eq!(claims.name, "Ana");
    }

    #[rstest]
    #[case("ana@imdaz.org", "senha-errada")]
    #[case("ninguem@imdaz.org", "s3nha-da-secretaria")]
    #[tokio::test]
    async fn test_login_with_bad_credentials(#[case] email: &str, #[case] password: &str) {
        let (service, _repo) = user_service();
        service
            .create(&account_payload("Ana", "ana@imdaz.org"))
            .await;

        let response = service.login(&login_payload(email, password)).await;

        assert_eq!(to_json(&response), json!({"error": LOGIN_FAILED}));
        assert_eq!(response.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_requires_fields() {
        let (service, _repo) = user_service();

        let response = service
            .login(&login_payload("ana@imdaz.org", ""))
            .await;
        assert_eq!(
            to_json(&response),
            json!({"error": "O campo password é obrigatório."})
        );
    }

    #[tokio::test]
    async fn test_fetch_returns_own_account_without_password() {
        let (service, _repo) = user_service();
        let auth = logged_in(&service).await;

        let body = to_json(&service.fetch(&auth).await);
        assert_eq!(body["name"], json!("Ana"));
        assert_eq!(body["email"], json!("ana@imdaz.org"));
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn test_update_own_account() {
        let (service, repo) = user_service();
        let auth = logged_in(&service).await;

        let response = service
            .update(&auth, &account_payload("Ana Paula", "ana.paula@imdaz.org"))
            .await;
        assert_eq!(to_json(&response), json!(USER_UPDATED));

        let stored = repo.get_user(1).await.unwrap().unwrap();
        assert_eq!(stored.name, "Ana Paula");
        assert_eq!(stored.email, "ana.paula@imdaz.org");
    }

    #[tokio::test]
    async fn test_update_cannot_take_another_email() {
        let (service, _repo) = user_service();
        let auth = logged_in(&service).await;
        service
            .create(&account_payload("Bia", "bia@imdaz.org"))
            .await;

        let response = service
            .update(&auth, &account_payload("Ana", "bia@imdaz.org"))
            .await;
        assert_eq!(to_json(&response), json!({"error": EMAIL_TAKEN}));
    }

    #[tokio::test]
    async fn test_remove_twice() {
        let (service, _repo) = user_service();
        let auth = logged_in(&service).await;
        service
            .create(&account_payload("Bia", "bia@imdaz.org"))
            .await;

        assert_eq!(to_json(&service.remove(&auth, 2).await), json!(USER_DELETED));
        assert_eq!(
            to_json(&service.remove(&auth, 2).await),
            json!({"error": DELETE_FAILED})
        );
        assert_eq!(
            to_json(&service.remove(&auth, None::<i32>).await),
            json!({"error": DELETE_FAILED})
        );
    }

    #[tokio::test]
    async fn test_token_with_foreign_subject_asks_for_login() {
        let (service, _repo) = user_service();
        let token = test_token_config()
            .create_token("not-a-number".to_string(), "x".to_string())
            .unwrap();

        let response = service.fetch(&Authorization::bearer(token)).await;
        assert_eq!(to_json(&response), json!({"unauthorized": LOGIN_REQUIRED}));
    }

    #[tokio::test]
    async fn test_rejected_authorization_never_reaches_store() {
        let (service, repo) = user_service();
        let auth = Authorization::rejected(MISSING_TOKEN);

        let fetched = service.fetch(&auth).await;
        let updated = service
            .update(&auth, &account_payload("Ana", "ana@imdaz.org"))
            .await;
        let removed = service.remove(&auth, 1).await;

        for response in [to_json(&fetched), to_json(&updated), to_json(&removed)] {
            assert_eq!(response, json!({"unauthorized": MISSING_TOKEN}));
        }
        assert_eq!(repo.user_count(), 0);
    }
}
