//! Hosting provider client.

use crate::{build_http_client, classify_send_error, HostingError};
use async_trait::async_trait;
use picvault_core::models::{Credential, RemoteImage};
use picvault_core::Config;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Result of a remote delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Provider answered 404 for this hash. Only conclusive when the hash is
    /// the one recorded at upload time.
    AlreadyGone { body: String },
}

#[async_trait]
pub trait HostingClient: Send + Sync {
    /// Upload raw image bytes.
    ///
    /// With a credential the request carries `Authorization: Bearer`; without
    /// one it falls back to the anonymous `Client-ID` header.
    async fn upload(
        &self,
        payload: Vec<u8>,
        file_name: &str,
        credential: Option<&Credential>,
    ) -> Result<RemoteImage, HostingError>;

    /// Delete a remote image by its delete hash.
    async fn delete(
        &self,
        delete_hash: &str,
        credential: &Credential,
    ) -> Result<DeleteOutcome, HostingError>;
}

#[derive(Debug, Clone)]
pub struct ImgurEndpoints {
    pub upload_url: String,
    pub delete_url: String,
}

impl ImgurEndpoints {
    pub fn from_config(config: &Config) -> Self {
        Self {
            upload_url: config.upload_url.clone(),
            delete_url: config.delete_url.clone(),
        }
    }

    /// `{delete_url}/{hash}` with the hash as one escaped path segment.
    fn delete_url_for(&self, delete_hash: &str) -> Result<Url, HostingError> {
        let mut url = Url::parse(&self.delete_url).map_err(|e| {
            HostingError::Client(format!("Invalid delete URL '{}': {}", self.delete_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                HostingError::Client(format!(
                    "Delete URL '{}' cannot carry a path",
                    self.delete_url
                ))
            })?
            .pop_if_empty()
            .push(delete_hash);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<UploadedImage>,
}

#[derive(Debug, Deserialize)]
struct UploadedImage {
    id: Option<String>,
    link: Option<String>,
    deletehash: Option<String>,
}

/// HTTP client for an Imgur-compatible image API.
pub struct ImgurClient {
    http: reqwest::Client,
    endpoints: ImgurEndpoints,
    client_id: String,
    timeout: Duration,
}

impl ImgurClient {
    pub fn new(config: &Config) -> Result<Self, HostingError> {
        Ok(Self {
            http: build_http_client(config.hosting_timeout)?,
            endpoints: ImgurEndpoints::from_config(config),
            client_id: config.client_id.clone(),
            timeout: config.hosting_timeout,
        })
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<(StatusCode, String), HostingError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_send_error(e, self.timeout))?;
        Ok((status, body))
    }

    fn parse_upload(status: StatusCode, body: &str) -> Result<RemoteImage, HostingError> {
        let invalid = |message: String| HostingError::InvalidResponse {
            status: status.as_u16(),
            message,
        };

        let envelope: Envelope = serde_json::from_str(body)
            .map_err(|e| invalid(format!("Upload response is not valid JSON: {}", e)))?;
        let data = envelope
            .data
            .ok_or_else(|| invalid("Upload response is missing 'data'".to_string()))?;

        RemoteImage::new(
            data.id.unwrap_or_default(),
            data.link.unwrap_or_default(),
            data.deletehash.unwrap_or_default(),
        )
        .map_err(|e| invalid(e.to_string()))
    }
}

#[async_trait]
impl HostingClient for ImgurClient {
    #[tracing::instrument(skip(self, payload, credential), fields(size_bytes = payload.len()))]
    async fn upload(
        &self,
        payload: Vec<u8>,
        file_name: &str,
        credential: Option<&Credential>,
    ) -> Result<RemoteImage, HostingError> {
        let start = Instant::now();
        let authorization = match credential {
            Some(credential) => credential.bearer(),
            None => format!("Client-ID {}", self.client_id),
        };

        let form = Form::new().part("image", Part::bytes(payload).file_name(file_name.to_string()));

        tracing::debug!(url = %self.endpoints.upload_url, "Sending upload request");

        let response = self
            .http
            .post(&self.endpoints.upload_url)
            .header(AUTHORIZATION, authorization)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_send_error(e, self.timeout))?;

        let (status, body) = self.read_body(response).await?;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                body = %body,
                duration_ms = duration_ms,
                "Hosting provider rejected upload"
            );
            return Err(HostingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(status = status.as_u16(), body = %body, "Upload response");

        let remote = Self::parse_upload(status, &body)?;

        tracing::info!(
            remote_id = %remote.remote_id,
            duration_ms = duration_ms,
            "Image uploaded to hosting provider"
        );

        Ok(remote)
    }

    #[tracing::instrument(skip(self, credential))]
    async fn delete(
        &self,
        delete_hash: &str,
        credential: &Credential,
    ) -> Result<DeleteOutcome, HostingError> {
        let start = Instant::now();
        let url = self.endpoints.delete_url_for(delete_hash)?;

        let response = self
            .http
            .delete(url)
            .header(AUTHORIZATION, credential.bearer())
            .send()
            .await
            .map_err(|e| classify_send_error(e, self.timeout))?;

        let (status, body) = self.read_body(response).await?;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        if status == StatusCode::NOT_FOUND {
            tracing::info!(duration_ms = duration_ms, "Remote image already gone");
            return Ok(DeleteOutcome::AlreadyGone { body });
        }

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                body = %body,
                duration_ms = duration_ms,
                "Hosting provider rejected delete"
            );
            return Err(HostingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(
            status = status.as_u16(),
            duration_ms = duration_ms,
            "Remote image deleted"
        );

        Ok(DeleteOutcome::Deleted)
    }
}
