//! Upload, list and delete flows.

use crate::publisher::{ArchivePublisher, PublishHandle};
use picvault_core::models::{
    validate_payload_name, Credential, ImageRecord, UploadIntentMessage, User,
};
use picvault_core::{AppError, Config, HostingAuthMode};
use picvault_db::{OwnershipStore, RecordLocks};
use picvault_hosting::{DeleteOutcome, HostingClient, HostingOperation, TokenManager};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

const MAX_DELETE_HASH_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub auth_mode: HostingAuthMode,
    pub max_upload_size_bytes: usize,
    /// Deadline for the remote part of upload/delete when the caller gives none.
    pub default_timeout: Duration,
}

impl UploadOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auth_mode: config.hosting_auth_mode,
            max_upload_size_bytes: config.max_upload_size_bytes,
            default_timeout: config.request_timeout,
        }
    }
}

pub struct UploadOutcome {
    pub record: ImageRecord,
    /// Archive publish, if archiving is enabled. Await or drop.
    pub publish: Option<PublishHandle>,
}

/// Coordinates the hosting provider, the ownership store and archive publishing.
pub struct UploadOrchestrator {
    tokens: Arc<dyn TokenManager>,
    hosting: Arc<dyn HostingClient>,
    store: Arc<dyn OwnershipStore>,
    locks: RecordLocks,
    publisher: Option<ArchivePublisher>,
    options: UploadOptions,
}

impl UploadOrchestrator {
    pub fn new(
        tokens: Arc<dyn TokenManager>,
        hosting: Arc<dyn HostingClient>,
        store: Arc<dyn OwnershipStore>,
        options: UploadOptions,
    ) -> Self {
        Self {
            tokens,
            hosting,
            store,
            locks: RecordLocks::new(),
            publisher: None,
            options,
        }
    }

    pub fn with_publisher(mut self, publisher: ArchivePublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Upload `payload` for `owner`.
    ///
    /// The record is saved only after the provider confirms the upload. The
    /// remote upload is not rolled back if the save fails. The archive publish
    /// runs in the background and never affects the result.
    #[tracing::instrument(skip(self, owner, payload), fields(owner = %owner.username, size_bytes = payload.len()))]
    pub async fn upload(
        &self,
        owner: &User,
        payload: Vec<u8>,
        name: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<UploadOutcome, AppError> {
        let start = Instant::now();

        if payload.is_empty() {
            return Err(AppError::Validation("Image payload is empty".to_string()));
        }
        if payload.len() > self.options.max_upload_size_bytes {
            return Err(AppError::Validation(format!(
                "Image exceeds maximum size of {} bytes",
                self.options.max_upload_size_bytes
            )));
        }

        let id = Uuid::new_v4();
        let image_name = match name.map(|n| n.trim().to_string()) {
            Some(n) if !n.is_empty() => n,
            _ => format!("{}-{}", owner.username, id),
        };
        validate_payload_name(&image_name)?;

        let deadline = timeout.unwrap_or(self.options.default_timeout);
        let remote = with_deadline(deadline, async {
            let credential = self.upload_credential().await?;
            self.hosting
                .upload(payload.clone(), &image_name, credential.as_ref())
                .await
                .map_err(|e| e.into_app_error(HostingOperation::Upload))
        })
        .await?;

        let record = ImageRecord::from_upload(id, owner, image_name, remote);

        if let Err(e) = self.store.save(&record).await {
            tracing::error!(
                remote_id = %record.remote_id,
                error = %e,
                "Image uploaded but ownership record could not be saved"
            );
            return Err(e);
        }

        let publish = self.publisher.as_ref().map(|publisher| {
            publisher.submit(UploadIntentMessage::new(
                owner.username.clone(),
                record.image_name.clone(),
                payload,
            ))
        });

        tracing::info!(
            image_id = %record.id,
            remote_id = %record.remote_id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image uploaded"
        );

        Ok(UploadOutcome { record, publish })
    }

    /// Records owned by `owner`, newest first.
    #[tracing::instrument(skip(self, owner), fields(owner = %owner.username))]
    pub async fn list(&self, owner: &User) -> Result<Vec<ImageRecord>, AppError> {
        let start = Instant::now();
        let records = self.store.list_by_owner(owner.id).await?;

        tracing::debug!(
            count = records.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Listed images"
        );

        Ok(records)
    }

    /// Delete image `id` on behalf of `owner`.
    ///
    /// Ownership is checked before any remote call. The local record is removed
    /// only after the provider confirms the delete (or reports the image gone).
    /// `delete_hash` overrides the stored hash when given.
    #[tracing::instrument(skip(self, owner, delete_hash), fields(owner = %owner.username, image_id = %id))]
    pub async fn delete(
        &self,
        owner: &User,
        id: Uuid,
        delete_hash: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<DeleteOutcome, AppError> {
        let start = Instant::now();
        let _guard = self.locks.acquire(id).await;

        let record = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image {}", id)))?;

        if !record.is_owned_by(owner) {
            tracing::warn!("Delete refused: requester does not own image");
            return Err(AppError::Unauthorized(format!(
                "Image {} is not owned by {}",
                id, owner.username
            )));
        }

        let delete_hash = match delete_hash.map(str::trim).filter(|hash| !hash.is_empty()) {
            Some(hash) => {
                validate_delete_hash(hash)?;
                hash
            }
            None => record.delete_hash.as_str(),
        };
        let uses_stored_hash = delete_hash == record.delete_hash;

        let deadline = timeout.unwrap_or(self.options.default_timeout);
        let outcome = with_deadline(deadline, async {
            let credential = self
                .tokens
                .get_token()
                .await
                .map_err(|e| e.into_app_error(HostingOperation::Token))?;
            self.hosting
                .delete(delete_hash, &credential)
                .await
                .map_err(|e| e.into_app_error(HostingOperation::Delete))
        })
        .await?;

        // A 404 for a hash other than the stored one says nothing about the image.
        if let DeleteOutcome::AlreadyGone { body } = &outcome {
            if !uses_stored_hash {
                tracing::warn!("Provider does not know the supplied delete hash; keeping record");
                return Err(AppError::HostingDelete {
                    status: 404,
                    body: body.clone(),
                });
            }
        }

        self.store.remove(id).await?;

        tracing::info!(
            remote_id = %record.remote_id,
            outcome = ?outcome,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image deleted"
        );

        Ok(outcome)
    }

    async fn upload_credential(&self) -> Result<Option<Credential>, AppError> {
        match self.options.auth_mode {
            HostingAuthMode::ClientId => Ok(None),
            HostingAuthMode::Bearer => self
                .tokens
                .get_token()
                .await
                .map(Some)
                .map_err(|e| e.into_app_error(HostingOperation::Token)),
        }
    }
}

/// Delete hashes are plain alphanumeric tokens issued by the provider.
fn validate_delete_hash(hash: &str) -> Result<(), AppError> {
    if hash.len() > MAX_DELETE_HASH_LEN || !hash.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::Validation(format!(
            "Delete hash must be 1 to {} letters or digits",
            MAX_DELETE_HASH_LEN
        )));
    }
    Ok(())
}

async fn with_deadline<T>(
    deadline: Duration,
    operation: impl Future<Output = Result<T, AppError>>,
) -> Result<T, AppError> {
    tokio::time::timeout(deadline, operation)
        .await
        .map_err(|_| AppError::Timeout(deadline))?
}
