use super::{hash_password, validate_registration, StoredUser, UserRepository};
use async_trait::async_trait;
use picvault_core::models::User;
use picvault_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// User repository backed by the `users` table.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[tracing::instrument(skip(self, password), fields(db.table = "users", db.operation = "insert"))]
    async fn create(&self, username: &str, password: &str) -> Result<User, AppError> {
        validate_registration(username, password)?;
        let password_hash = hash_password(password)?;

        let result = sqlx::query_as::<Postgres, User>(
            r#"
            INSERT INTO users (id, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Validation(format!("Username '{}' is already taken", username)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            "SELECT id, username, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn find_credentials(&self, username: &str) -> Result<Option<StoredUser>, AppError> {
        let stored = sqlx::query_as::<Postgres, StoredUser>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stored)
    }
}
