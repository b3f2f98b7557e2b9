use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imdaz::{
    app, db, AppConfig, AppError, AppState, InMemoryStudentRepository, InMemoryUserRepository,
    PostgresStudentRepository, PostgresUserRepository, StudentRepository, UserRepository,
};

#[tokio::main]
async fn main() {
    // Missing .env is fine; real deployments set the environment directly
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imdaz=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "Server stopped with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    info!("Starting IMDAZ student service");

    let config = AppConfig::from_env()?;

    // Easy to switch between implementations: Postgres when configured, memory otherwise
    let (student_repository, user_repository): (
        Arc<dyn StudentRepository + Send + Sync>,
        Arc<dyn UserRepository + Send + Sync>,
    ) = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::connect(&config, url).await?;
            (
                Arc::new(PostgresStudentRepository::new(pool.clone())),
                Arc::new(PostgresUserRepository::new(pool)),
            )
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory repositories");
            (
                Arc::new(InMemoryStudentRepository::new()),
                Arc::new(InMemoryUserRepository::new()),
            )
        }
    };

    let app_state = AppState::new(student_repository, user_repository, config.token.clone());
    let router = app(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| AppError::Config(format!("cannot bind {}: {}", config.bind_addr, e)))?;
    info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, router).await.map_err(|e| {
        error!(error = %e, "Server failed");
        AppError::Internal
    })
}
