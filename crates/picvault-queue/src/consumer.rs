//! Archive ingest worker.

use crate::channel::{Delivery, MessageChannel};
use crate::codec::decode_intent;
use crate::QueueError;
use picvault_core::models::validate_payload_name;
use picvault_storage::Storage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Counters reported when the consumer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Written to the sink and acked.
    pub processed: u64,
    /// Acked without a write: malformed message or unusable name.
    pub dropped: u64,
    /// Write failed; nacked for redelivery.
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ConsumerStats {
        ConsumerStats {
            processed: self.processed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

enum Outcome {
    Stored,
    Dropped,
    Retry,
}

/// Long-lived worker that moves upload intents from a channel into a sink.
pub struct IngestConsumer {
    channel: Arc<dyn MessageChannel>,
    storage: Arc<dyn Storage>,
    counters: Arc<Counters>,
}

/// Handle to a running consumer.
pub struct ConsumerHandle {
    shutdown_tx: mpsc::Sender<()>,
    counters: Arc<Counters>,
    join: JoinHandle<ConsumerStats>,
}

impl ConsumerHandle {
    /// Counters so far, without stopping the worker.
    pub fn stats(&self) -> ConsumerStats {
        self.counters.snapshot()
    }

    /// Stop after the delivery in progress (if any) and return final counters.
    pub async fn shutdown(self) -> ConsumerStats {
        let _ = self.shutdown_tx.send(()).await;
        match self.join.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "Ingest consumer task failed");
                self.counters.snapshot()
            }
        }
    }

    /// Wait for the worker to exit on its own (channel closed and drained).
    pub async fn join(self) -> ConsumerStats {
        match self.join.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "Ingest consumer task failed");
                self.counters.snapshot()
            }
        }
    }
}

impl IngestConsumer {
    pub fn new(channel: Arc<dyn MessageChannel>, storage: Arc<dyn Storage>) -> Self {
        Self {
            channel,
            storage,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Spawn the worker loop.
    pub fn start(self) -> ConsumerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let counters = self.counters.clone();
        let join = tokio::spawn(self.run(shutdown_rx));

        ConsumerHandle {
            shutdown_tx,
            counters,
            join,
        }
    }

    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) -> ConsumerStats {
        tracing::info!("Ingest consumer started");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Ingest consumer shutting down");
                    break;
                }
                received = self.channel.receive() => match received {
                    Ok(delivery) => self.handle(delivery).await,
                    Err(QueueError::Closed) => {
                        tracing::info!("Channel closed, ingest consumer exiting");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to receive from channel");
                        tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        let stats = self.counters.snapshot();
        tracing::info!(
            processed = stats.processed,
            dropped = stats.dropped,
            failed = stats.failed,
            "Ingest consumer stopped"
        );
        stats
    }

    #[tracing::instrument(skip(self, delivery), fields(tag = delivery.tag, attempt = delivery.attempt))]
    async fn handle(&self, delivery: Delivery) {
        let start = Instant::now();
        let outcome = self.process(&delivery).await;

        let settled = match outcome {
            Outcome::Stored => {
                self.counters.processed.fetch_add(1, Ordering::Relaxed);
                self.channel.ack(delivery.tag).await
            }
            Outcome::Dropped => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                self.channel.ack(delivery.tag).await
            }
            Outcome::Retry => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                self.channel.nack(delivery.tag).await
            }
        };

        if let Err(e) = settled {
            tracing::error!(error = %e, "Failed to settle delivery");
        }

        tracing::debug!(
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Delivery handled"
        );
    }

    async fn process(&self, delivery: &Delivery) -> Outcome {
        let message = match decode_intent(&delivery.payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed message");
                return Outcome::Dropped;
            }
        };

        if let Err(e) = validate_payload_name(&message.payload_name) {
            tracing::warn!(
                owner = %message.owner,
                error = %e,
                "Dropping message with unusable payload name"
            );
            return Outcome::Dropped;
        }

        match self
            .storage
            .put(&message.payload_name, &message.payload)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    owner = %message.owner,
                    payload_name = %message.payload_name,
                    size_bytes = message.payload.len(),
                    "Archived upload"
                );
                Outcome::Stored
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    owner = %message.owner,
                    payload_name = %message.payload_name,
                    error = %e,
                    "Archive write failed, message will be redelivered"
                );
                Outcome::Retry
            }
            Err(e) => {
                tracing::error!(
                    owner = %message.owner,
                    payload_name = %message.payload_name,
                    error = %e,
                    "Archive write rejected, dropping message"
                );
                Outcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::InMemoryChannel;
    use crate::codec::encode_intent;
    use async_trait::async_trait;
    use picvault_core::models::UploadIntentMessage;
    use picvault_storage::{LocalStorage, StorageError, StorageResult};
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    fn intent(name: &str, payload: &[u8]) -> String {
        encode_intent(&UploadIntentMessage::new("alice", name, payload.to_vec())).unwrap()
    }

    async fn wait_until_drained(channel: &InMemoryChannel) {
        for _ in 0..200 {
            if channel.pending() == 0 && channel.in_flight() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("channel did not drain");
    }

    #[tokio::test]
    async fn test_writes_exact_bytes_and_acks() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let channel = InMemoryChannel::new(16, Duration::from_millis(5));

        let handle = IngestConsumer::new(Arc::new(channel.clone()), storage).start();
        channel.publish(intent("a.png", &[1, 2, 3])).await.unwrap();
        wait_until_drained(&channel).await;

        let stats = handle.shutdown().await;
        assert_eq!(stats.processed, 1);
        assert_eq!(std::fs::read(dir.path().join("a.png")).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_redelivery_overwrites_with_identical_bytes() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let channel = InMemoryChannel::new(16, Duration::from_millis(5));

        let handle = IngestConsumer::new(Arc::new(channel.clone()), storage).start();
        channel.publish(intent("a.png", b"payload")).await.unwrap();
        channel.publish(intent("a.png", b"payload")).await.unwrap();
        wait_until_drained(&channel).await;

        let stats = handle.shutdown().await;
        assert_eq!(stats.processed, 2);
        assert_eq!(
            std::fs::read(dir.path().join("a.png")).unwrap(),
            b"payload".to_vec()
        );
    }

    #[tokio::test]
    async fn test_malformed_message_does_not_block_valid_ones() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let channel = InMemoryChannel::new(16, Duration::from_millis(5));

        let handle = IngestConsumer::new(Arc::new(channel.clone()), storage).start();
        channel.publish("{not json".to_string()).await.unwrap();
        channel.publish(intent("../escape.png", b"x")).await.unwrap();
        channel.publish(intent("b.png", b"ok")).await.unwrap();
        wait_until_drained(&channel).await;

        let stats = handle.shutdown().await;
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.processed, 1);
        assert!(dir.path().join("b.png").exists());
        assert!(!dir.path().parent().unwrap().join("escape.png").exists());
    }

    /// Fails the first `failures` writes, then delegates.
    struct FlakyStorage {
        inner: LocalStorage,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl Storage for FlakyStorage {
        async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StorageError::WriteFailed("disk unavailable".to_string()));
            }
            self.inner.put(key, data).await
        }

        async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> StorageResult<bool> {
            self.inner.exists(key).await
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_nacked_and_redelivered() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(FlakyStorage {
            inner: LocalStorage::new(dir.path()).await.unwrap(),
            failures: AtomicUsize::new(2),
        });
        let channel = InMemoryChannel::new(16, Duration::from_millis(5));

        let handle = IngestConsumer::new(Arc::new(channel.clone()), storage).start();
        channel.publish(intent("retry.png", &[9, 9])).await.unwrap();
        wait_until_drained(&channel).await;

        let stats = handle.shutdown().await;
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.processed, 1);
        assert_eq!(std::fs::read(dir.path().join("retry.png")).unwrap(), vec![9, 9]);
    }

    #[tokio::test]
    async fn test_exits_when_channel_closed() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let channel = InMemoryChannel::new(16, Duration::from_millis(5));
        channel.publish(intent("a.png", b"a")).await.unwrap();
        channel.close();

        let stats = IngestConsumer::new(Arc::new(channel.clone()), storage)
            .start()
            .join()
            .await;

        assert_eq!(stats.processed, 1);
    }
}
