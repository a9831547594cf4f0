//! Hosting provider integration.
//!
//! Two seams, both injected as trait objects:
//!
//! - [`TokenManager`] exchanges the configured refresh token for a bearer
//!   [`Credential`](picvault_core::models::Credential).
//! - [`HostingClient`] uploads image bytes and deletes remote images.
//!
//! [`ImgurClient`] and [`OAuthTokenManager`] implement them over HTTP. Success is
//! decided by status code alone; response bodies are logged either way.

pub mod client;
pub mod error;
pub mod token;

pub use client::{DeleteOutcome, HostingClient, ImgurClient, ImgurEndpoints};
pub use error::{HostingError, HostingOperation};
pub use token::{FetchAttempt, OAuthTokenManager, StaticTokenManager, TokenManager};

use std::time::Duration;

/// Build the shared reqwest client with a request timeout.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, HostingError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| HostingError::Client(e.to_string()))
}

/// Map a reqwest failure onto the transport/timeout classes.
pub(crate) fn classify_send_error(err: reqwest::Error, timeout: Duration) -> HostingError {
    if err.is_timeout() {
        HostingError::Timeout(timeout)
    } else {
        HostingError::Transport(err.to_string())
    }
}
