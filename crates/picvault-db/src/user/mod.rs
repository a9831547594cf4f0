//! User accounts and credential checks.

mod authenticator;
mod memory;
mod password;
mod postgres;

pub use authenticator::Authenticator;
pub use memory::InMemoryUserRepository;
pub use password::{hash_password, verify_password};
pub use postgres::PgUserRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use picvault_core::models::User;
use picvault_core::AppError;
use sqlx::FromRow;
use uuid::Uuid;

const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;

/// A user row including the password hash. Never leaves this crate's callers
/// as anything but a [`User`].
#[derive(Debug, Clone, FromRow)]
pub struct StoredUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl StoredUser {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Register a user. The password is hashed before it is stored.
    async fn create(&self, username: &str, password: &str) -> Result<User, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Row including the password hash, for [`Authenticator`].
    async fn find_credentials(&self, username: &str) -> Result<Option<StoredUser>, AppError>;
}

pub(crate) fn validate_registration(username: &str, password: &str) -> Result<(), AppError> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "Username must be between 1 and {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(AppError::Validation(
            "Username may contain only letters, digits, '-', '_' and '.'".to_string(),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
