use super::OwnershipStore;
use async_trait::async_trait;
use picvault_core::models::ImageRecord;
use picvault_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const IMAGE_COLUMNS: &str =
    "id, owner_id, remote_id, remote_link, delete_hash, image_name, created_at";

/// Ownership store backed by the `images` table.
#[derive(Clone)]
pub struct PgOwnershipStore {
    pool: PgPool,
}

impl PgOwnershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OwnershipStore for PgOwnershipStore {
    #[tracing::instrument(skip(self, record), fields(db.table = "images", db.operation = "upsert", db.record_id = %record.id))]
    async fn save(&self, record: &ImageRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO images (id, owner_id, remote_id, remote_link, delete_hash, image_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                remote_id = EXCLUDED.remote_id,
                remote_link = EXCLUDED.remote_link,
                delete_hash = EXCLUDED.delete_hash,
                image_name = EXCLUDED.image_name
            "#,
        )
        .bind(record.id)
        .bind(record.owner_id)
        .bind(&record.remote_id)
        .bind(&record.remote_link)
        .bind(&record.delete_hash)
        .bind(&record.image_name)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %id))]
    async fn find(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            "SELECT {} FROM images WHERE id = $1",
            IMAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<ImageRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            "SELECT {} FROM images WHERE owner_id = $1 ORDER BY created_at DESC",
            IMAGE_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "delete", db.record_id = %id))]
    async fn remove(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            "DELETE FROM images WHERE id = $1 RETURNING {}",
            IMAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
