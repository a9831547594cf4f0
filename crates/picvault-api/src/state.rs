//! Application state shared by handlers.

use picvault_core::Config;
use picvault_db::Authenticator;
use picvault_queue::InMemoryChannel;
use picvault_services::UploadOrchestrator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub orchestrator: Arc<UploadOrchestrator>,
    pub authenticator: Authenticator,
    /// Archive channel, when archiving is enabled. Exposed for health reporting.
    pub archive_channel: Option<InMemoryChannel>,
}
