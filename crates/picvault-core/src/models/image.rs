use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::user::User;
use crate::AppError;

/// Identity of an image on the hosting provider, as returned by a confirmed upload.
///
/// All three fields are required; a provider response missing any of them is
/// rejected before a `RemoteImage` can exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteImage {
    pub remote_id: String,
    pub link: String,
    pub delete_hash: String,
}

impl RemoteImage {
    pub fn new(
        remote_id: impl Into<String>,
        link: impl Into<String>,
        delete_hash: impl Into<String>,
    ) -> Result<Self, AppError> {
        let remote = Self {
            remote_id: remote_id.into(),
            link: link.into(),
            delete_hash: delete_hash.into(),
        };
        for (field, value) in [
            ("id", &remote.remote_id),
            ("link", &remote.link),
            ("deletehash", &remote.delete_hash),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Decode(format!(
                    "Hosting response is missing '{}'",
                    field
                )));
            }
        }
        Ok(remote)
    }
}

/// Local ownership record for an image stored on the hosting provider.
///
/// Built only from a [`RemoteImage`], so the remote id and delete hash are
/// always present together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct ImageRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub remote_id: String,
    pub remote_link: String,
    pub delete_hash: String,
    pub image_name: String,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    pub fn from_upload(id: Uuid, owner: &User, image_name: String, remote: RemoteImage) -> Self {
        Self {
            id,
            owner_id: owner.id,
            remote_id: remote.remote_id,
            remote_link: remote.link,
            delete_hash: remote.delete_hash,
            image_name,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user: &User) -> bool {
        self.owner_id == user.id
    }
}

/// Response body returned to the uploader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub id: Uuid,
    pub remote_id: String,
    pub link: String,
    pub delete_hash: String,
    pub owner: String,
    pub image_name: String,
    pub message: String,
}

impl ImageResponse {
    pub fn uploaded(record: &ImageRecord, owner: &User) -> Self {
        Self {
            id: record.id,
            remote_id: record.remote_id.clone(),
            link: record.remote_link.clone(),
            delete_hash: record.delete_hash.clone(),
            owner: owner.username.clone(),
            image_name: record.image_name.clone(),
            message: "Uploaded Success".to_string(),
        }
    }
}
