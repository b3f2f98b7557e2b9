use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

use crate::shared::AppError;
use crate::validation::{FieldKind, FieldRule, FieldSchema};

const ACCOUNT_RULES: &[FieldRule] = &[
    FieldRule::required("name", FieldKind::Text),
    FieldRule::required("email", FieldKind::Email),
    FieldRule::required("password", FieldKind::Secret),
];

const LOGIN_RULES: &[FieldRule] = &[
    FieldRule::required("email", FieldKind::Email),
    FieldRule::required("password", FieldKind::Secret),
];

/// Database model for the imdaz_users table
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
pub struct UserModel {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserModel {
    pub fn new(id: i32, account: UserAccount) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: account.name,
            email: account.email,
            password: account.password,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces name, email and password hash; the id and created_at stay
    pub fn apply(&mut self, account: UserAccount) {
        self.name = account.name;
        self.email = account.email;
        self.password = account.password;
        self.updated_at = Utc::now();
    }
}

/// Validated registration or update payload. `password` holds the hash once stored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UserAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl UserAccount {
    pub const fn schema() -> FieldSchema {
        FieldSchema::new(ACCOUNT_RULES)
    }

    pub fn from_validated(fields: Map<String, Value>) -> Result<Self, AppError> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::Validation(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub const fn schema() -> FieldSchema {
        FieldSchema::new(LOGIN_RULES)
    }

    pub fn from_validated(fields: Map<String, Value>) -> Result<Self, AppError> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::Validation(e.to_string()))
    }
}

/// Body returned by a successful login
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LoginResponse {
    pub token: String,
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_password_is_never_serialized() {
        let user = UserModel::new(1, stored_account("Secretaria", "secretaria@imdaz.org"));

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["email"], "secretaria@imdaz.org");
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_apply_keeps_identity() {
        let mut user = UserModel::new(3, stored_account("Antes", "antes@imdaz.org"));
        let created_at = user.created_at;

        user.apply(stored_account("Depois", "depois@imdaz.org"));

        assert_eq!(user.id, 3);
        assert_eq!(user.name, "Depois");
        assert_eq!(user.created_at, created_at);
    }

    #[test]
    fn test_schemas() {
        assert_eq!(UserAccount::schema().required().count(), 3);
        assert_eq!(LoginRequest::schema().required().count(), 2);
    }
}
