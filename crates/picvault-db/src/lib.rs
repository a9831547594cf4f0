//! Persistence for picvault: image ownership records and user accounts.
//!
//! Both concerns sit behind async traits with an in-memory implementation (used
//! when no `DATABASE_URL` is configured, and in tests) and a PostgreSQL one.

pub mod image;
pub mod locks;
pub mod user;

pub use image::{InMemoryOwnershipStore, OwnershipStore, PgOwnershipStore};
pub use locks::{RecordGuard, RecordLocks};
pub use user::{
    hash_password, verify_password, Authenticator, InMemoryUserRepository, PgUserRepository,
    StoredUser, UserRepository,
};
