//! Mock hosting collaborators for testing
//!
//! `MockHostingClient` keeps an in-memory set of remote images keyed by delete
//! hash and records every call made against it.

use async_trait::async_trait;
use picvault_core::models::{Credential, RemoteImage};
use picvault_hosting::{DeleteOutcome, HostingClient, HostingError, TokenManager};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Token manager that hands out a fixed token, or a fixed rejection.
pub struct MockTokenManager {
    token: String,
    rejection: Option<(u16, String)>,
    calls: AtomicUsize,
}

impl MockTokenManager {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            rejection: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails as if the token endpoint answered `status`.
    pub fn rejecting(status: u16, body: &str) -> Self {
        Self {
            token: String::new(),
            rejection: Some((status, body.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenManager for MockTokenManager {
    async fn get_token(&self) -> Result<Credential, HostingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.rejection {
            Some((status, body)) if *status >= 500 => Err(HostingError::TokenServer {
                status: *status,
                body: body.clone(),
            }),
            Some((status, body)) => Err(HostingError::AuthRejected {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(Credential::new(self.token.clone())),
        }
    }
}

/// How the mock answers deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteBehavior {
    /// Known hashes are deleted; unknown hashes are rejected with 400.
    Strict,
    /// Every delete reports the hash as unknown to the provider (404).
    AlreadyGone,
}

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub payload: Vec<u8>,
    pub file_name: String,
    /// Bearer token used, `None` for Client-ID uploads.
    pub bearer: Option<String>,
}

/// In-memory hosting provider.
#[derive(Clone)]
pub struct MockHostingClient {
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
    deletes: Arc<Mutex<Vec<String>>>,
    live_hashes: Arc<Mutex<HashSet<String>>>,
    upload_failure: Option<(u16, String)>,
    delete_behavior: DeleteBehavior,
    latency: Option<Duration>,
}

impl Default for MockHostingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHostingClient {
    pub fn new() -> Self {
        Self {
            uploads: Arc::new(Mutex::new(Vec::new())),
            deletes: Arc::new(Mutex::new(Vec::new())),
            live_hashes: Arc::new(Mutex::new(HashSet::new())),
            upload_failure: None,
            delete_behavior: DeleteBehavior::Strict,
            latency: None,
        }
    }

    /// Uploads answer with `status` and `body`.
    pub fn failing_uploads(mut self, status: u16, body: &str) -> Self {
        self.upload_failure = Some((status, body.to_string()));
        self
    }

    pub fn with_delete_behavior(mut self, behavior: DeleteBehavior) -> Self {
        self.delete_behavior = behavior;
        self
    }

    /// Sleep before answering each call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    /// Delete hashes the provider accepted or reported gone, in order.
    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl HostingClient for MockHostingClient {
    async fn upload(
        &self,
        payload: Vec<u8>,
        file_name: &str,
        credential: Option<&Credential>,
    ) -> Result<RemoteImage, HostingError> {
        self.simulate_latency().await;

        let count = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(RecordedUpload {
                payload,
                file_name: file_name.to_string(),
                bearer: credential.map(|c| c.token.clone()),
            });
            uploads.len()
        };

        if let Some((status, body)) = &self.upload_failure {
            return Err(HostingError::Rejected {
                status: *status,
                body: body.clone(),
            });
        }

        let remote_id = if count == 1 {
            "abc".to_string()
        } else {
            format!("abc{}", count)
        };
        let delete_hash = format!("dh{}", remote_id);
        self.live_hashes.lock().unwrap().insert(delete_hash.clone());

        RemoteImage::new(
            remote_id.clone(),
            format!("http://i.hosting.test/{}", remote_id),
            delete_hash,
        )
        .map_err(|e| HostingError::InvalidResponse {
            status: 200,
            message: e.to_string(),
        })
    }

    async fn delete(
        &self,
        delete_hash: &str,
        _credential: &Credential,
    ) -> Result<DeleteOutcome, HostingError> {
        self.simulate_latency().await;

        match self.delete_behavior {
            DeleteBehavior::AlreadyGone => {
                self.deletes.lock().unwrap().push(delete_hash.to_string());
                Ok(DeleteOutcome::AlreadyGone {
                    body: format!("Image '{}' not found", delete_hash),
                })
            }
            DeleteBehavior::Strict => {
                if !self.live_hashes.lock().unwrap().remove(delete_hash) {
                    return Err(HostingError::Rejected {
                        status: 400,
                        body: format!("Unknown delete hash '{}'", delete_hash),
                    });
                }
                self.deletes.lock().unwrap().push(delete_hash.to_string());
                Ok(DeleteOutcome::Deleted)
            }
        }
    }
}
