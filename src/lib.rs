// Library crate for the IMDAZ student-management backend
// This file exposes the public API for integration tests

pub mod auth;
pub mod config;
pub mod db;
pub mod response;
pub mod routes;
pub mod shared;
pub mod student;
pub mod user;
pub mod validation;

// Re-export commonly used types for easier access in tests
pub use auth::{Authorization, JwtTokenVerifier, TokenConfig, TokenVerifier, UserClaims};
pub use config::AppConfig;
pub use response::ServiceResponse;
pub use routes::app;
pub use shared::{AppError, AppState};
pub use student::{
    models::{EnrollmentModel, StudentFields, StudentModel},
    repository::{InMemoryStudentRepository, PostgresStudentRepository, StudentRepository},
    StudentService,
};
pub use user::{
    models::{LoginResponse, UserAccount, UserModel},
    repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository},
    UserService,
};
