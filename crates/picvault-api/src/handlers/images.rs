use crate::auth::AuthenticatedUser;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use picvault_core::models::{ImageRecord, ImageResponse};
use picvault_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Multipart field carrying the image bytes. `image` is accepted as an alias.
const FILE_FIELD: &str = "file";
const FILE_FIELD_ALIAS: &str = "image";
/// Optional text field overriding the archive name.
const NAME_FIELD: &str = "name";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutQuery {
    /// Deadline for the remote call, in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl TimeoutQuery {
    fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    pub delete_hash: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageListItem {
    pub id: Uuid,
    pub remote_id: String,
    pub link: String,
    pub delete_hash: String,
    pub image_name: String,
    pub created_at: String,
}

impl From<ImageRecord> for ImageListItem {
    fn from(record: ImageRecord) -> Self {
        Self {
            id: record.id,
            remote_id: record.remote_id,
            link: record.remote_link,
            delete_hash: record.delete_hash,
            image_name: record.image_name,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

struct UploadForm {
    payload: Vec<u8>,
    name: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, HttpAppError> {
    let mut payload = None;
    let mut file_name = None;
    let mut explicit_name = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some(FILE_FIELD) | Some(FILE_FIELD_ALIAS) => {
                file_name = field.file_name().map(str::to_string);
                payload = Some(field.bytes().await?.to_vec());
            }
            Some(NAME_FIELD) => {
                explicit_name = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let payload = payload.ok_or_else(|| {
        AppError::Validation(format!("Missing multipart field '{}'", FILE_FIELD))
    })?;

    Ok(UploadForm {
        payload,
        name: explicit_name.or(file_name),
    })
}

/// Upload an image (HTTP 201 with the hosting provider's id and link).
///
/// The archive copy is published in the background; its outcome does not
/// affect this response.
#[tracing::instrument(skip(state, user, query, multipart), fields(owner = %user.0.username, operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<TimeoutQuery>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let AuthenticatedUser(user) = user;
    let form = read_upload_form(multipart).await?;

    let outcome = state
        .orchestrator
        .upload(&user, form.payload, form.name, query.timeout())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ImageResponse::uploaded(&outcome.record, &user)),
    ))
}

/// List the caller's images, newest first.
#[tracing::instrument(skip(state, user), fields(owner = %user.0.username, operation = "list_images"))]
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let records = state.orchestrator.list(&user.0).await?;
    let items: Vec<ImageListItem> = records.into_iter().map(ImageListItem::from).collect();
    Ok(Json(items))
}

/// Delete one of the caller's images (HTTP 204).
#[tracing::instrument(skip(state, user, query), fields(owner = %user.0.username, image_id = %id, operation = "delete_image"))]
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .orchestrator
        .delete(
            &user.0,
            id,
            query.delete_hash.as_deref(),
            query.timeout_ms.map(Duration::from_millis),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
