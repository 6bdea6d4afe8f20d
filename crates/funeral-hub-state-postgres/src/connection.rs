use funeral_hub_core::CoreError;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;
use tracing::{debug, info};

use crate::{error::map_sqlx_error, migrations::generate_migrations, PostgresConfig};

/// Database connection manager for Postgres
#[derive(Clone)]
pub struct PostgresConnection {
    pub(crate) pool: PgPool,
}

impl PostgresConnection {
    /// Create a new PostgreSQL connection pool, running migrations if configured
    pub async fn new(config: &PostgresConfig) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.connection_string)
            .await
            .map_err(|e| CoreError::Configuration(format!("Failed to connect to database: {}", e)))?;
        debug!("Connected to PostgreSQL database");

        let conn = Self { pool };
        if config.run_migrations {
            conn.run_migrations().await?;
        }
        Ok(conn)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply every migration not yet recorded in `schema_migrations`
    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        info!("Running database migrations");

        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to create schema_migrations"))?;

        let applied: Vec<String> = sqlx::query("SELECT name FROM schema_migrations")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to read applied migrations"))?
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error(e, "Failed to read applied migrations"))?;

        for (name, sql) in generate_migrations() {
            if applied.iter().any(|done| done == name) {
                continue;
            }
            debug!("Applying migration: {}", name);

            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| map_sqlx_error(e, "Failed to begin migration"))?;
            sqlx::raw_sql(sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| CoreError::Internal(format!("Migration '{}' failed: {}", name, e)))?;
            sqlx::query("INSERT INTO schema_migrations (name) VALUES ($1)")
                .bind(name)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error(e, "Failed to record migration"))?;
            tx.commit()
                .await
                .map_err(|e| map_sqlx_error(e, "Failed to commit migration"))?;
        }

        info!("Migrations completed successfully");
        Ok(())
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
