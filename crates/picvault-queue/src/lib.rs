//! Archive pipeline plumbing.
//!
//! Producers encode an [`UploadIntentMessage`](picvault_core::models::UploadIntentMessage)
//! with [`codec`] and publish it on a [`MessageChannel`]. The [`IngestConsumer`]
//! decodes each delivery, writes the payload to a [`Storage`](picvault_storage::Storage)
//! sink and acknowledges only after the write has completed.
//!
//! Delivery is at-least-once: an unacknowledged or nacked delivery comes back.

pub mod channel;
pub mod codec;
pub mod consumer;
pub mod error;

pub use channel::{Delivery, DeliveryTag, InMemoryChannel, MessageChannel};
pub use codec::{decode_intent, encode_intent};
pub use consumer::{ConsumerHandle, ConsumerStats, IngestConsumer};
pub use error::QueueError;
