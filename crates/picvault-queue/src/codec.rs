//! Wire format for upload intents.
//!
//! ```json
//! {"username":"alice","imageName":"a.png","imageBytes":"AQID","encoding":"base64"}
//! ```
//!
//! `encoding` may be absent and defaults to base64.

use crate::QueueError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use picvault_core::models::{PayloadEncoding, UploadIntentMessage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    username: String,
    image_name: String,
    image_bytes: String,
    #[serde(default)]
    encoding: PayloadEncoding,
}

pub fn encode_intent(message: &UploadIntentMessage) -> Result<String, QueueError> {
    let image_bytes = match message.encoding {
        PayloadEncoding::Base64 => STANDARD.encode(&message.payload),
    };

    let wire = WireMessage {
        username: message.owner.clone(),
        image_name: message.payload_name.clone(),
        image_bytes,
        encoding: message.encoding,
    };

    serde_json::to_string(&wire).map_err(|e| QueueError::Encode(e.to_string()))
}

pub fn decode_intent(raw: &str) -> Result<UploadIntentMessage, QueueError> {
    let wire: WireMessage =
        serde_json::from_str(raw).map_err(|e| QueueError::Decode(e.to_string()))?;

    let payload = match wire.encoding {
        PayloadEncoding::Base64 => STANDARD
            .decode(wire.image_bytes.as_bytes())
            .map_err(|e| QueueError::Decode(format!("imageBytes is not valid base64: {}", e)))?,
    };

    Ok(UploadIntentMessage {
        owner: wire.username,
        payload_name: wire.image_name,
        payload,
        encoding: wire.encoding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let message = UploadIntentMessage::new("alice", "a.png", vec![1, 2, 3]);

        let raw = encode_intent(&message).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["username"], "alice");
        assert_eq!(value["imageName"], "a.png");
        assert_eq!(value["imageBytes"], "AQID");
        assert_eq!(value["encoding"], "base64");
        assert_eq!(decode_intent(&raw).unwrap(), message);
    }

    #[test]
    fn test_binary_payload_survives() {
        let payload: Vec<u8> = (0..=255).collect();
        let message = UploadIntentMessage::new("bob", "all-bytes.bin", payload.clone());

        let decoded = decode_intent(&encode_intent(&message).unwrap()).unwrap();
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn test_encoding_defaults_when_absent() {
        let decoded =
            decode_intent(r#"{"username":"alice","imageName":"a.png","imageBytes":"AQID"}"#)
                .unwrap();

        assert_eq!(decoded.payload, vec![1, 2, 3]);
        assert_eq!(decoded.encoding, PayloadEncoding::Base64);
    }

    #[test]
    fn test_malformed_messages() {
        assert!(matches!(decode_intent("not json"), Err(QueueError::Decode(_))));
        assert!(matches!(
            decode_intent(r#"{"username":"alice","imageName":"a.png"}"#),
            Err(QueueError::Decode(_))
        ));
        assert!(matches!(
            decode_intent(r#"{"username":"alice","imageName":"a.png","imageBytes":"***"}"#),
            Err(QueueError::Decode(_))
        ));
        assert!(matches!(
            decode_intent(
                r#"{"username":"alice","imageName":"a.png","imageBytes":"AQID","encoding":"rot13"}"#
            ),
            Err(QueueError::Decode(_))
        ));
    }
}
