use picvault_core::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Channel is closed")]
    Closed,

    #[error("Channel is full ({capacity} messages outstanding)")]
    Full { capacity: usize },

    #[error("Unknown delivery tag {0}")]
    UnknownDelivery(u64),

    #[error("Failed to encode message: {0}")]
    Encode(String),

    #[error("Malformed message: {0}")]
    Decode(String),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Decode(msg) => AppError::Decode(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}
