use tracing::{info, instrument, warn};

use super::{
    token::TokenConfig,
    types::{Authorization, UserClaims},
};
use crate::shared::AppError;

/// Message returned whenever a presented token cannot be verified
pub const LOGIN_REQUIRED: &str = "Realize o login para acessar esse recurso.";

/// Verifies bearer tokens and yields the authenticated identity
pub trait TokenVerifier {
    fn verify(&self, token: &str) -> Result<UserClaims, AppError>;
}

/// Token verifier backed by HS256 JWTs
pub struct JwtTokenVerifier {
    token_config: TokenConfig,
}

impl JwtTokenVerifier {
    pub fn new(token_config: TokenConfig) -> Self {
        Self { token_config }
    }
}

impl TokenVerifier for JwtTokenVerifier {
    #[instrument(skip(self, token))]
    fn verify(&self, token: &str) -> Result<UserClaims, AppError> {
        match self.token_config.validate_token(token) {
            Ok(claims) => {
                info!(user_id = %claims.sub, "Token verified");
                Ok(claims)
            }
            Err(e) => {
                warn!("Token verification failed: {}", e);
                Err(AppError::Unauthorized(LOGIN_REQUIRED.to_string()))
            }
        }
    }
}

impl Authorization {
    /// Header errors are echoed verbatim; any verifier failure asks for login
    pub fn authorize(
        &self,
        verifier: &(dyn TokenVerifier + Send + Sync),
    ) -> Result<UserClaims, AppError> {
        match self {
            Authorization::Rejected(message) => {
                warn!(message = %message, "Request carried a rejected authorization");
                Err(AppError::Unauthorized(message.clone()))
            }
            Authorization::Bearer(token) => verifier.verify(token).map_err(|e| {
                warn!("Token verification failed: {}", e);
                AppError::Unauthorized(LOGIN_REQUIRED.to_string())
            }),
        }
    }
}
