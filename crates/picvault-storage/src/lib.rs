//! Archive sink for image payloads that arrive through the ingest queue.
//!
//! Each decoded payload lands under the archive root, keyed by its image name:
//!
//! - `<archive_root>/<image_name>`
//!
//! Keys must not contain `..` or a leading `/`. Writes overwrite, so replaying
//! the same message leaves identical bytes behind.

pub mod local;
pub mod traits;

pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
