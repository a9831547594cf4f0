use picvault_core::AppError;
use std::time::Duration;
use thiserror::Error;

/// Which remote call produced an error; decides the `AppError` it becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostingOperation {
    Token,
    Upload,
    Delete,
}

/// Errors from the token endpoint and the hosting provider.
#[derive(Debug, Error)]
pub enum HostingError {
    /// Token endpoint answered 4xx.
    #[error("Token request rejected with status {status}: {body}")]
    AuthRejected { status: u16, body: String },

    /// Token endpoint answered 5xx.
    #[error("Token endpoint failed with status {status}: {body}")]
    TokenServer { status: u16, body: String },

    /// Hosting provider answered non-2xx.
    #[error("Hosting provider returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// 2xx response whose body lacks a required field.
    #[error("Invalid response (status {status}): {message}")]
    InvalidResponse { status: u16, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl HostingError {
    /// Whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HostingError::TokenServer { .. } | HostingError::Timeout(_) | HostingError::Transport(_)
        )
    }

    pub fn into_app_error(self, operation: HostingOperation) -> AppError {
        match (self, operation) {
            (HostingError::AuthRejected { status, body }, _) => {
                AppError::UpstreamAuthRejected { status, body }
            }
            (HostingError::TokenServer { status, body }, _) => {
                AppError::TokenServer { status, body }
            }
            (HostingError::InvalidResponse { status, message }, HostingOperation::Token) => {
                AppError::UpstreamAuthRejected {
                    status,
                    body: message,
                }
            }
            (HostingError::Rejected { status, body }, HostingOperation::Delete) => {
                AppError::HostingDelete { status, body }
            }
            (HostingError::InvalidResponse { status, message }, HostingOperation::Delete) => {
                AppError::HostingDelete {
                    status,
                    body: message,
                }
            }
            (HostingError::Rejected { status, body }, _) => AppError::HostingUpload { status, body },
            (HostingError::InvalidResponse { status, message }, _) => AppError::HostingUpload {
                status,
                body: message,
            },
            (HostingError::Timeout(duration), _) => AppError::Timeout(duration),
            (HostingError::Transport(msg), _) => AppError::Transport(msg),
            (HostingError::Client(msg), _) => AppError::Internal(msg),
        }
    }
}
