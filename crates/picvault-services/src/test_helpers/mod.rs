//! Test helpers for orchestrator tests
//!
//! Mock hosting collaborators and user fixtures, so upload/delete flows can be
//! exercised without a network or database.

pub mod mock_hosting;

pub use mock_hosting::{DeleteBehavior, MockHostingClient, MockTokenManager, RecordedUpload};

use chrono::Utc;
use picvault_core::models::User;
use uuid::Uuid;

/// Build a user with a fresh id.
pub fn user(username: &str) -> User {
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        created_at: Utc::now(),
    }
}

pub fn alice() -> User {
    user("alice")
}

pub fn bob() -> User {
    user("bob")
}
