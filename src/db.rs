use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::shared::AppError;

/// Opens the Postgres pool and, when enabled, applies pending migrations
#[instrument(skip(config, database_url))]
pub async fn connect(config: &AppConfig, database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await?;
    info!(
        max_connections = config.database_max_connections,
        "Connected to database"
    );

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    Ok(pool)
}
