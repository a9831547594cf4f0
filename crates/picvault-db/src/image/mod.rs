//! Image ownership records.

mod memory;
mod postgres;

pub use memory::InMemoryOwnershipStore;
pub use postgres::PgOwnershipStore;

use async_trait::async_trait;
use picvault_core::models::ImageRecord;
use picvault_core::AppError;
use uuid::Uuid;

/// Maps a local image id to its owner and hosting metadata.
///
/// Implementations must allow concurrent reads. Callers that need
/// read-check-remove sequences serialize them with
/// [`RecordLocks`](crate::RecordLocks).
#[async_trait]
pub trait OwnershipStore: Send + Sync {
    /// Insert a record, replacing any record with the same id.
    async fn save(&self, record: &ImageRecord) -> Result<(), AppError>;

    async fn find(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError>;

    /// Records owned by `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<ImageRecord>, AppError>;

    /// Remove a record, returning it if it existed.
    async fn remove(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError>;
}
