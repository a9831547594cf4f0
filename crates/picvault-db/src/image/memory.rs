use super::OwnershipStore;
use async_trait::async_trait;
use picvault_core::models::ImageRecord;
use picvault_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local ownership store.
#[derive(Clone, Default)]
pub struct InMemoryOwnershipStore {
    records: Arc<RwLock<HashMap<Uuid, ImageRecord>>>,
}

impl InMemoryOwnershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl OwnershipStore for InMemoryOwnershipStore {
    async fn save(&self, record: &ImageRecord) -> Result<(), AppError> {
        self.records.write().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<ImageRecord>, AppError> {
        let mut records: Vec<ImageRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn remove(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError> {
        Ok(self.records.write().await.remove(&id))
    }
}
