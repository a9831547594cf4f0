use serde::{Deserialize, Serialize};

use crate::AppError;

const MAX_PAYLOAD_NAME_LEN: usize = 255;

/// How the payload bytes are represented on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    #[default]
    Base64,
}

/// Request to archive a copy of an uploaded image.
///
/// Exists only between publish and consume; its effect is a file in the archive sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadIntentMessage {
    pub owner: String,
    pub payload_name: String,
    pub payload: Vec<u8>,
    pub encoding: PayloadEncoding,
}

impl UploadIntentMessage {
    pub fn new(owner: impl Into<String>, payload_name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            owner: owner.into(),
            payload_name: payload_name.into(),
            payload,
            encoding: PayloadEncoding::Base64,
        }
    }
}

/// Payload names become file names in the archive root, so they must be a
/// single plain path component.
pub fn validate_payload_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Image name must not be empty".to_string()));
    }
    if name.len() > MAX_PAYLOAD_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Image name exceeds {} bytes",
            MAX_PAYLOAD_NAME_LEN
        )));
    }
    if name == "." || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(AppError::Validation(format!(
            "Image name '{}' contains path components",
            name
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(AppError::Validation(
            "Image name contains control characters".to_string(),
        ));
    }
    Ok(())
}
