//! Persistence setup: PostgreSQL when `DATABASE_URL` is set, in-memory otherwise.

use anyhow::{Context, Result};
use picvault_core::Config;
use picvault_db::{
    InMemoryOwnershipStore, InMemoryUserRepository, OwnershipStore, PgOwnershipStore,
    PgUserRepository, UserRepository,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct Persistence {
    pub users: Arc<dyn UserRepository>,
    pub images: Arc<dyn OwnershipStore>,
}

pub async fn setup_persistence(config: &Config) -> Result<Persistence> {
    match &config.database_url {
        Some(url) => {
            let pool = setup_database(url, config.db_max_connections).await?;
            Ok(Persistence {
                users: Arc::new(PgUserRepository::new(pool.clone())),
                images: Arc::new(PgOwnershipStore::new(pool)),
            })
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores (data is lost on restart)");
            Ok(Persistence {
                users: Arc::new(InMemoryUserRepository::new()),
                images: Arc::new(InMemoryOwnershipStore::new()),
            })
        }
    }
}

/// Setup database connection pool and run migrations
async fn setup_database(url: &str, max_connections: u32) -> Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(max_connections, "Database connected successfully");

    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}
