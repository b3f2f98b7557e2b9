// Public API - what other modules can use
pub use extractor::{MALFORMED_TOKEN, MISSING_TOKEN};
pub use token::TokenConfig;
pub use types::{Authorization, UserClaims};
pub use verifier::{JwtTokenVerifier, TokenVerifier, LOGIN_REQUIRED};

// Internal modules
mod extractor;
mod token;
mod types;
mod verifier;
