//! Error types module
//!
//! All failures that can reach a caller of the upload pipeline are unified under
//! the `AppError` enum. Crate-local errors (hosting, storage, queue) convert into
//! it at the orchestrator boundary so nothing escapes unclassified.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;
use std::time::Duration;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for remote failures the caller may retry
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "HOSTING_UPLOAD_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried by the caller)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The caller's credentials were rejected.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// The token endpoint rejected the server's own hosting credentials.
    #[error("Hosting credentials rejected with status {status}: {body}")]
    UpstreamAuthRejected { status: u16, body: String },

    /// Ownership mismatch.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Hosting upload failed with status {status}: {body}")]
    HostingUpload { status: u16, body: String },

    #[error("Hosting delete failed with status {status}: {body}")]
    HostingDelete { status: u16, body: String },

    /// Token endpoint answered 5xx.
    #[error("Token endpoint failed with status {status}: {body}")]
    TokenServer { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::AuthRejected(_) => (
            401,
            "AUTH_REJECTED",
            false,
            Some("Check username and password"),
            false,
            LogLevel::Debug,
        ),
        AppError::UpstreamAuthRejected { .. } => (
            502,
            "UPSTREAM_AUTH_REJECTED",
            false,
            Some("Hosting credentials need attention; contact the operator"),
            false,
            LogLevel::Error,
        ),
        AppError::Unauthorized(_) => (
            403,
            "UNAUTHORIZED",
            false,
            Some("Only the owner of an image may delete it"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the image ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::HostingUpload { .. } => (
            502,
            "HOSTING_UPLOAD_FAILED",
            false,
            Some("Inspect the provider response before retrying"),
            false,
            LogLevel::Warn,
        ),
        AppError::HostingDelete { .. } => (
            502,
            "HOSTING_DELETE_FAILED",
            false,
            Some("Check the delete hash and retry"),
            false,
            LogLevel::Warn,
        ),
        AppError::TokenServer { .. } => (
            503,
            "TOKEN_SERVER_ERROR",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::Transport(_) => (
            502,
            "TRANSPORT_ERROR",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::Timeout(_) => (
            504,
            "TIMEOUT",
            true,
            Some("Retry with a longer timeout"),
            false,
            LogLevel::Warn,
        ),
        AppError::Decode(_) => (
            422,
            "DECODE_ERROR",
            false,
            None,
            false,
            LogLevel::Warn,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Validation(_) => "ValidationError",
            AppError::AuthRejected(_) => "AuthRejected",
            AppError::UpstreamAuthRejected { .. } => "UpstreamAuthRejected",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::NotFound(_) => "NotFound",
            AppError::HostingUpload { .. } => "HostingUploadError",
            AppError::HostingDelete { .. } => "HostingDeleteError",
            AppError::TokenServer { .. } => "TokenServerError",
            AppError::Transport(_) => "TransportError",
            AppError::Timeout(_) => "Timeout",
            AppError::Decode(_) => "DecodeError",
            AppError::Storage(_) => "Storage",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Validation(ref msg) => msg.clone(),
            AppError::AuthRejected(ref msg) => msg.clone(),
            AppError::UpstreamAuthRejected { status, .. } => {
                format!("Hosting provider rejected the server's credentials ({})", status)
            }
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            // Remote errors are surfaced verbatim so the caller sees what the provider said.
            AppError::HostingUpload { status, body } => {
                format!("Hosting provider rejected upload ({}): {}", status, body)
            }
            AppError::HostingDelete { status, body } => {
                format!("Hosting provider rejected delete ({}): {}", status, body)
            }
            AppError::TokenServer { status, .. } => {
                format!("Token endpoint unavailable ({})", status)
            }
            AppError::Transport(ref msg) => msg.clone(),
            AppError::Timeout(duration) => {
                format!("Operation timed out after {} ms", duration.as_millis())
            }
            AppError::Decode(ref msg) => msg.clone(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
