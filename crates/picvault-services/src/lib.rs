//! Picvault service layer.
//!
//! [`UploadOrchestrator`] drives the synchronous upload/list/delete flows against
//! the hosting provider and the ownership store, and hands archive copies to
//! the [`ArchivePublisher`] worker pool. HTTP handling stays in `picvault-api`.

pub mod publisher;
pub mod upload;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use publisher::{ArchivePublisher, PublishHandle};
pub use upload::{UploadOptions, UploadOrchestrator, UploadOutcome};

pub use picvault_hosting::DeleteOutcome;
