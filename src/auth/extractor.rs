use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::convert::Infallible;
use tracing::{debug, warn};

use super::types::Authorization;

pub const MISSING_TOKEN: &str = "Token de autorização não informado.";
pub const MALFORMED_TOKEN: &str = "Formato do token de autorização inválido.";

impl Authorization {
    /// Reads the Bearer credential from request headers.
    /// Header problems become `Rejected` instead of failing the request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(AUTHORIZATION) else {
            warn!("Missing Authorization header in request");
            return Authorization::rejected(MISSING_TOKEN);
        };

        let Ok(value) = value.to_str() else {
            warn!("Authorization header is not valid ASCII");
            return Authorization::rejected(MALFORMED_TOKEN);
        };

        match value.strip_prefix("Bearer ").map(str::trim) {
            Some(token) if !token.is_empty() => {
                debug!("Extracted token from Authorization Bearer header");
                Authorization::bearer(token)
            }
            _ => {
                warn!("Invalid Authorization header format (expected Bearer token)");
                Authorization::rejected(MALFORMED_TOKEN)
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Authorization
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Authorization::from_headers(&parts.headers))
    }
}
