//! Application setup and initialization
//!
//! Builds persistence, hosting clients, the archive pipeline and the router
//! from a [`Config`]. Telemetry is installed by the binary before this runs.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use picvault_core::Config;
use picvault_queue::{ConsumerHandle, ConsumerStats, InMemoryChannel, MessageChannel};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A fully wired application.
pub struct App {
    pub state: Arc<AppState>,
    pub router: Router,
    pub archive: Option<ArchivePipeline>,
}

/// The archive channel and the consumer draining it.
pub struct ArchivePipeline {
    pub channel: InMemoryChannel,
    consumer: ConsumerHandle,
}

impl ArchivePipeline {
    pub fn new(channel: InMemoryChannel, consumer: ConsumerHandle) -> Self {
        Self { channel, consumer }
    }

    pub fn stats(&self) -> ConsumerStats {
        self.consumer.stats()
    }

    /// Close the channel, give outstanding messages up to `drain_timeout` to
    /// reach the sink, then stop the consumer.
    pub async fn shutdown(self, drain_timeout: Duration) -> ConsumerStats {
        self.channel.close();

        let start = Instant::now();
        while self.channel.pending() + self.channel.in_flight() > 0 {
            if start.elapsed() >= drain_timeout {
                tracing::warn!(
                    pending = self.channel.pending(),
                    in_flight = self.channel.in_flight(),
                    "Archive drain timed out; undelivered messages are dropped"
                );
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        self.consumer.shutdown().await
    }
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<App> {
    config
        .validate()
        .context("Configuration validation failed")?;

    let persistence = database::setup_persistence(&config).await?;
    let archive = services::setup_archive(&config).await?;
    let state = services::initialize_services(
        &config,
        persistence,
        archive.as_ref().map(|pipeline| pipeline.channel.clone()),
    )?;
    let router = routes::setup_routes(&config, state.clone());

    tracing::info!(
        archive_enabled = archive.is_some(),
        auth_mode = ?config.hosting_auth_mode,
        "Application initialized"
    );

    Ok(App {
        state,
        router,
        archive,
    })
}
