#![allow(dead_code)] // Test utilities may not all be used in every test

use std::sync::Arc;

use axum::Router;

use imdaz::{
    app, AppState, InMemoryStudentRepository, InMemoryUserRepository, StudentModel, TokenConfig,
};

pub const TEST_SECRET: &str = "imdaz-integration-secret";

// ============================================================================
// Test Setup
// ============================================================================

pub struct TestSetup {
    pub app: Router,
    pub repository: Arc<InMemoryStudentRepository>,
    pub token_config: TokenConfig,
}

impl TestSetup {
    /// Signed token accepted by the app under test
    pub fn token(&self) -> String {
        self.token_config
            .create_token("1".to_string(), "secretaria".to_string())
            .unwrap()
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token())
    }
}

pub struct TestSetupBuilder {
    students: Vec<StudentModel>,
    expiration_hours: i64,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            students: vec![],
            expiration_hours: 1,
        }
    }

    /// Seed the repository with existing students
    pub fn with_students(mut self, students: Vec<StudentModel>) -> Self {
        self.students = students;
        self
    }

    /// Issue tokens that are already expired
    pub fn with_expired_tokens(mut self) -> Self {
        self.expiration_hours = -2;
        self
    }

    pub fn build(self) -> TestSetup {
        let repository = Arc::new(InMemoryStudentRepository::with_students(self.students));
        let state = AppState::new(
            repository.clone(),
            Arc::new(InMemoryUserRepository::new()),
            TokenConfig::with_secret(TEST_SECRET, 1),
        );

        TestSetup {
            app: app(state),
            repository,
            token_config: TokenConfig::with_secret(TEST_SECRET, self.expiration_hours),
        }
    }
}
