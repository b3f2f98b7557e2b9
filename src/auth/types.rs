use serde::{Deserialize, Serialize};

/// JWT claims identifying the authenticated staff user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserClaims {
    pub sub: String,  // User identifier
    pub name: String, // Display name of the logged in user
    pub exp: usize,   // Expiration timestamp (standard JWT claim)
    pub iat: usize,   // Issued at timestamp (standard JWT claim)
}

/// Authorization credential as extracted from the request.
///
/// Header problems are detected up front and carried as `Rejected`, so the
/// service can echo them back without attempting verification.
#[derive(Debug, Clone, PartialEq)]
pub enum Authorization {
    Bearer(String),
    Rejected(String),
}

impl Authorization {
    pub fn bearer(token: impl Into<String>) -> Self {
        Authorization::Bearer(token.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Authorization::Rejected(message.into())
    }
}
