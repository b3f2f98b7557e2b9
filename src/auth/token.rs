use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::types::UserClaims;
use crate::shared::AppError;

/// Configuration for JWT token operations
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub expiration_hours: i64,
}

impl TokenConfig {
    pub fn with_secret(secret: impl Into<String>, expiration_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours,
        }
    }

    /// Creates a new JWT token for the given user
    #[instrument(skip(self, user_id, name))]
    pub fn create_token(&self, user_id: String, name: String) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = (now + Duration::hours(self.expiration_hours)).timestamp() as usize;

        debug!(
            expiration_hours = self.expiration_hours,
            exp_timestamp = exp,
            "Creating JWT token with expiration"
        );

        let claims = UserClaims {
            sub: user_id,
            name,
            exp,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            AppError::JwtError(e.to_string())
        })
    }

    /// Validates a JWT token and returns the claims if valid
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<UserClaims, AppError> {
        debug!("Decoding and validating JWT token");

        decode::<UserClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(user_id = %data.claims.sub, exp = data.claims.exp, "JWT token decoded successfully");
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            AppError::JwtError(e.to_string())
        })
    }
}
