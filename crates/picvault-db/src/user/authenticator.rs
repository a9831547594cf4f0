use super::{verify_password, UserRepository};
use picvault_core::models::User;
use picvault_core::AppError;
use std::sync::Arc;

const REJECTED: &str = "Invalid username or password";

/// Checks a username/password pair against the user repository.
#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
}

impl Authenticator {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub fn users(&self) -> &Arc<dyn UserRepository> {
        &self.users
    }

    /// Resolve the caller's identity.
    ///
    /// Unknown users and wrong passwords produce the same `AuthRejected` error.
    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let Some(stored) = self.users.find_credentials(username).await? else {
            tracing::debug!("Authentication failed: unknown user");
            return Err(AppError::AuthRejected(REJECTED.to_string()));
        };

        if !verify_password(password, &stored.password_hash)? {
            tracing::debug!("Authentication failed: password mismatch");
            return Err(AppError::AuthRejected(REJECTED.to_string()));
        }

        Ok(stored.into_user())
    }
}
