//! Service wiring.

use super::database::Persistence;
use super::ArchivePipeline;
use crate::state::AppState;
use anyhow::{Context, Result};
use picvault_core::Config;
use picvault_db::Authenticator;
use picvault_hosting::{ImgurClient, OAuthTokenManager};
use picvault_queue::{InMemoryChannel, IngestConsumer};
use picvault_services::{ArchivePublisher, UploadOptions, UploadOrchestrator};
use picvault_storage::LocalStorage;
use std::sync::Arc;

/// Create the archive channel and start its consumer, unless archiving is off.
pub async fn setup_archive(config: &Config) -> Result<Option<ArchivePipeline>> {
    if !config.archive_enabled {
        tracing::info!("Archive pipeline disabled");
        return Ok(None);
    }

    let storage = LocalStorage::new(&config.archive_root)
        .await
        .context("Failed to initialize archive storage")?;
    let channel = InMemoryChannel::new(config.queue_capacity, config.queue_redelivery_delay);
    let consumer = IngestConsumer::new(Arc::new(channel.clone()), Arc::new(storage)).start();

    tracing::info!(
        archive_root = %config.archive_root.display(),
        queue_capacity = config.queue_capacity,
        publish_workers = config.publish_workers,
        "Archive pipeline started"
    );

    Ok(Some(ArchivePipeline::new(channel, consumer)))
}

/// Build the orchestrator and authenticator around the given stores.
pub fn initialize_services(
    config: &Config,
    persistence: Persistence,
    archive_channel: Option<InMemoryChannel>,
) -> Result<Arc<AppState>> {
    let tokens = OAuthTokenManager::new(config).context("Failed to build token client")?;
    let hosting = ImgurClient::new(config).context("Failed to build hosting client")?;

    let mut orchestrator = UploadOrchestrator::new(
        Arc::new(tokens),
        Arc::new(hosting),
        persistence.images,
        UploadOptions::from_config(config),
    );
    if let Some(channel) = &archive_channel {
        orchestrator = orchestrator.with_publisher(ArchivePublisher::new(
            Arc::new(channel.clone()),
            config.publish_workers,
        ));
    }

    Ok(Arc::new(AppState {
        config: config.clone(),
        orchestrator: Arc::new(orchestrator),
        authenticator: Authenticator::new(persistence.users),
        archive_channel,
    }))
}
