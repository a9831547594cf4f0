//! Fire-and-forget archive publishing.

use futures::stream::{self, StreamExt};
use picvault_core::models::UploadIntentMessage;
use picvault_core::AppError;
use picvault_queue::{encode_intent, MessageChannel};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

struct PublishJob {
    message: UploadIntentMessage,
    done: oneshot::Sender<Result<(), AppError>>,
}

/// Publishes upload intents in submission order from a background dispatcher.
///
/// `submit` never waits on the channel. Up to `workers` payloads are encoded
/// at once, but they reach the channel in the order they were submitted.
#[derive(Clone)]
pub struct ArchivePublisher {
    jobs: mpsc::UnboundedSender<PublishJob>,
}

/// Handle to one submitted publish. Await it with [`PublishHandle::wait`] or drop
/// it; dropping does not cancel the publish.
pub struct PublishHandle {
    result: oneshot::Receiver<Result<(), AppError>>,
}

impl PublishHandle {
    pub async fn wait(self) -> Result<(), AppError> {
        self.result
            .await
            .map_err(|_| AppError::Internal("Publisher stopped before publishing".to_string()))?
    }
}

impl ArchivePublisher {
    /// Start the dispatcher. Must be called inside a tokio runtime; the
    /// dispatcher exits once every clone of the publisher is dropped.
    pub fn new(channel: Arc<dyn MessageChannel>, workers: usize) -> Self {
        let (jobs, queue) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(channel, queue, workers.max(1)));
        Self { jobs }
    }

    pub fn submit(&self, message: UploadIntentMessage) -> PublishHandle {
        let (done, result) = oneshot::channel();
        if let Err(mpsc::error::SendError(job)) = self.jobs.send(PublishJob { message, done }) {
            let _ = job
                .done
                .send(Err(AppError::Internal("Publisher is stopped".to_string())));
        }
        PublishHandle { result }
    }
}

struct Encoded {
    owner: String,
    payload_name: String,
    raw: Result<String, AppError>,
    done: oneshot::Sender<Result<(), AppError>>,
}

async fn encode(job: PublishJob) -> Encoded {
    let PublishJob { message, done } = job;
    let owner = message.owner.clone();
    let payload_name = message.payload_name.clone();

    let raw = match tokio::task::spawn_blocking(move || encode_intent(&message)).await {
        Ok(encoded) => encoded.map_err(AppError::from),
        Err(e) => Err(AppError::Internal(format!("Encode task failed: {}", e))),
    };

    Encoded {
        owner,
        payload_name,
        raw,
        done,
    }
}

async fn dispatch(
    channel: Arc<dyn MessageChannel>,
    queue: mpsc::UnboundedReceiver<PublishJob>,
    workers: usize,
) {
    let jobs = stream::unfold(queue, |mut queue| async move {
        queue.recv().await.map(|job| (job, queue))
    });
    // `buffered` yields in input order, so encoding overlaps but publishing does not.
    let mut encoded = Box::pin(jobs.map(encode).buffered(workers));

    while let Some(Encoded {
        owner,
        payload_name,
        raw,
        done,
    }) = encoded.next().await
    {
        let result = match raw {
            Ok(raw) => channel.publish(raw).await.map_err(AppError::from),
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => tracing::debug!(
                owner = %owner,
                payload_name = %payload_name,
                "Upload intent published"
            ),
            Err(e) => tracing::error!(
                owner = %owner,
                payload_name = %payload_name,
                error = %e,
                "Failed to publish upload intent"
            ),
        }
        let _ = done.send(result);
    }

    tracing::debug!("Archive publisher stopped");
}
