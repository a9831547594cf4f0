use super::{hash_password, validate_registration, StoredUser, UserRepository};
use async_trait::async_trait;
use chrono::Utc;
use picvault_core::models::User;
use picvault_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local user table keyed by username.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, StoredUser>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, username: &str, password: &str) -> Result<User, AppError> {
        validate_registration(username, password)?;
        let password_hash = hash_password(password)?;

        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(AppError::Validation(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let stored = StoredUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            created_at: Utc::now(),
        };
        users.insert(username.to_string(), stored.clone());

        Ok(stored.into_user())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .get(username)
            .cloned()
            .map(StoredUser::into_user))
    }

    async fn find_credentials(&self, username: &str) -> Result<Option<StoredUser>, AppError> {
        Ok(self.users.read().await.get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryUserRepository::new();
        let alice = repo.create("alice", "correct horse").await.unwrap();

        let found = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found, alice);

        let stored = repo.find_credentials("alice").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "correct horse");
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create("alice", "correct horse").await.unwrap();

        let err = repo.create("alice", "another pass").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
