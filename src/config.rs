use tracing::debug;

use crate::auth::TokenConfig;
use crate::shared::AppError;

/// Runtime configuration read from the environment
#[derive(Clone)]
pub struct AppConfig {
    /// Postgres connection string; the in-memory store is used when absent
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub run_migrations: bool,
    pub token: TokenConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the process env
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let database_max_connections: u32 = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().map_err(|_| {
                AppError::Config(format!("DATABASE_MAX_CONNECTIONS is not a number: {}", raw))
            })?,
            None => 5,
        };

        let run_migrations = match lookup("RUN_MIGRATIONS").as_deref() {
            None => true,
            Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "RUN_MIGRATIONS must be true or false, got {}",
                    other
                )))
            }
        };

        let expiration_hours: i64 = match lookup("TOKEN_EXPIRATION_HOURS") {
            Some(raw) => raw.parse().map_err(|_| {
                AppError::Config(format!("TOKEN_EXPIRATION_HOURS is not a number: {}", raw))
            })?,
            None => 24,
        };
        let secret = lookup("JWT_SECRET")
            .unwrap_or_else(|| "your-secret-key-change-in-production".to_string());

        let config = Self {
            database_url,
            database_max_connections,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            run_migrations,
            token: TokenConfig::with_secret(secret, expiration_hours),
        };

        debug!(
            has_database = config.database_url.is_some(),
            bind_addr = %config.bind_addr,
            run_migrations = config.run_migrations,
            "Configuration loaded"
        );
        Ok(config)
    }
}
