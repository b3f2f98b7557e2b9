use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument, warn};

use super::models::{UserAccount, UserModel};
use crate::shared::{next_id, AppError};

const DUPLICATE_EMAIL: &str =
    "duplicate key value violates unique constraint \"imdaz_users_email_key\"";

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository {
    async fn get_user(&self, id: i32) -> Result<Option<UserModel>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError>;
    async fn create_user(&self, account: &UserAccount) -> Result<Option<UserModel>, AppError>;
    async fn update_user(&self, id: i32, account: &UserAccount) -> Result<(), AppError>;
    async fn delete_user(&self, id: i32) -> Result<(), AppError>;
}

#[derive(Default)]
struct InMemoryUsers {
    users: BTreeMap<i32, UserModel>,
    last_user_id: i32,
}

impl InMemoryUsers {
    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// In-memory implementation of UserRepository for development and testing
/// Enforces the unique email constraint. Data is lost on restart.
#[derive(Default)]
pub struct InMemoryUserRepository {
    state: Mutex<InMemoryUsers>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.lock().map(|s| s.users.len()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryUsers>, AppError> {
        self.state.lock().map_err(|_| {
            warn!("In-memory user store lock poisoned");
            AppError::Internal
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self))]
    async fn get_user(&self, id: i32) -> Result<Option<UserModel>, AppError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    #[instrument(skip(self, email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    #[instrument(skip(self, account))]
    async fn create_user(&self, account: &UserAccount) -> Result<Option<UserModel>, AppError> {
        let mut state = self.lock()?;
        if state.email_taken(&account.email, None) {
            warn!("Email already registered in memory");
            return Err(AppError::DatabaseError(DUPLICATE_EMAIL.to_string()));
        }

        state.last_user_id = next_id(state.last_user_id, "imdaz_users_id_seq")?;
        let user = UserModel::new(state.last_user_id, account.clone());
        state.users.insert(user.id, user.clone());

        debug!(user_id = user.id, "User created in memory");
        Ok(Some(user))
    }

    #[instrument(skip(self, account))]
    async fn update_user(&self, id: i32, account: &UserAccount) -> Result<(), AppError> {
        let mut state = self.lock()?;
        if state.email_taken(&account.email, Some(id)) {
            warn!(user_id = id, "Email already registered to another user");
            return Err(AppError::DatabaseError(DUPLICATE_EMAIL.to_string()));
        }
        let Some(user) = state.users.get_mut(&id) else {
            warn!(user_id = id, "User not found for update in memory");
            return Err(AppError::NotFound("User not found".to_string()));
        };
        user.apply(account.clone());

        debug!(user_id = id, "User updated in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: i32) -> Result<(), AppError> {
        if self.lock()?.users.remove(&id).is_none() {
            warn!(user_id = id, "User not found for deletion in memory");
            return Err(AppError::NotFound("User not found".to_string()));
        }

        debug!(user_id = id, "User deleted from memory");
        Ok(())
    }
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self))]
    async fn get_user(&self, id: i32) -> Result<Option<UserModel>, AppError> {
        sqlx::query_as::<_, UserModel>("SELECT * FROM imdaz_users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = id, "Failed to fetch user");
                AppError::from(e)
            })
    }

    #[instrument(skip(self, email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        sqlx::query_as::<_, UserModel>("SELECT * FROM imdaz_users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to look up user by email");
                AppError::from(e)
            })
    }

    #[instrument(skip(self, account))]
    async fn create_user(&self, account: &UserAccount) -> Result<Option<UserModel>, AppError> {
        let user = sqlx::query_as::<_, UserModel>(
            "INSERT INTO imdaz_users (name, email, password) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create user");
            AppError::from(e)
        })?;

        if let Some(u) = &user {
            debug!(user_id = u.id, "User created in database");
        }
        Ok(user)
    }

    #[instrument(skip(self, account))]
    async fn update_user(&self, id: i32, account: &UserAccount) -> Result<(), AppError> {
        let updated = sqlx::query_as::<_, (i32,)>(
            "UPDATE imdaz_users SET name = $1, email = $2, password = $3, updated_at = NOW()
             WHERE id = $4 RETURNING id",
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = id, "Failed to update user");
            AppError::from(e)
        })?;

        if updated.is_none() {
            warn!(user_id = id, "User not found for update");
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: i32) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM imdaz_users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = id, "Failed to delete user");
                AppError::from(e)
            })?;

        if result.rows_affected() == 0 {
            warn!(user_id = id, "User not found for deletion");
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::models::fixtures::stored_account;

    #[tokio::test]
    async fn test_create_and_find_by_email() {
        let repo = InMemoryUserRepository::new();

        let created = repo
            .create_user(&stored_account("Secretaria", "secretaria@imdaz.org"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.id, 1);

        let found = repo
            .find_user_by_email("secretaria@imdaz.org")
            .await
            .unwrap();
        assert_eq!(found, Some(created));
        assert!(repo.find_user_by_email("outra@imdaz.org").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(&stored_account("Ana", "ana@imdaz.org"))
            .await
            .unwrap();

        let result = repo
            .create_user(&stored_account("Outra Ana", "ana@imdaz.org"))
            .await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert_eq!(repo.user_count(), 1);
    }

    #[tokio::test]
    async fn test_update_may_keep_own_email_but_not_take_another() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(&stored_account("Ana", "ana@imdaz.org"))
            .await
            .unwrap();
        repo.create_user(&stored_account("Bia", "bia@imdaz.org"))
            .await
            .unwrap();

        repo.update_user(1, &stored_account("Ana Paula", "ana@imdaz.org"))
            .await
            .unwrap();
        let result = repo
            .update_user(1, &stored_account("Ana Paula", "bia@imdaz.org"))
            .await;

        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert_eq!(repo.get_user(1).await.unwrap().unwrap().name, "Ana Paula");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_user() {
        let repo = InMemoryUserRepository::new();

        let updated = repo
            .update_user(9, &stored_account("Ninguém", "x@imdaz.org"))
            .await;
        let deleted = repo.delete_user(9).await;

        assert!(matches!(updated, Err(AppError::NotFound(_))));
        assert!(matches!(deleted, Err(AppError::NotFound(_))));
    }
}
