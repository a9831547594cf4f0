//! Message channel abstraction and the in-process broker.

use crate::QueueError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

pub type DeliveryTag = u64;

/// One delivery of a published message. Must be acked or nacked by tag.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub payload: String,
    /// 1 on first delivery, incremented on each redelivery.
    pub attempt: u32,
}

impl Delivery {
    pub fn is_redelivery(&self) -> bool {
        self.attempt > 1
    }
}

/// At-least-once message channel.
///
/// Messages from one producer are delivered in publish order. A delivery that is
/// nacked, or never acked before the channel is dropped, is not lost from the
/// channel's point of view until acked.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn publish(&self, payload: String) -> Result<(), QueueError>;

    /// Wait for the next delivery. Returns `QueueError::Closed` once the channel
    /// is closed and drained.
    async fn receive(&self) -> Result<Delivery, QueueError>;

    async fn ack(&self, tag: DeliveryTag) -> Result<(), QueueError>;

    /// Return a delivery to the channel for redelivery.
    async fn nack(&self, tag: DeliveryTag) -> Result<(), QueueError>;

    /// Stop accepting publishes; receivers drain what is left.
    fn close(&self);
}

#[derive(Debug, Clone)]
struct Envelope {
    payload: String,
    attempts: u32,
}

#[derive(Default)]
struct State {
    ready: VecDeque<Envelope>,
    in_flight: HashMap<DeliveryTag, Envelope>,
    delayed: usize,
    next_tag: DeliveryTag,
    closed: bool,
}

struct Inner {
    state: Mutex<State>,
    notify: Notify,
    capacity: usize,
    redelivery_delay: Duration,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Bounded in-process broker.
///
/// Capacity counts every outstanding message: ready, in flight and waiting for
/// redelivery.
#[derive(Clone)]
pub struct InMemoryChannel {
    inner: Arc<Inner>,
}

impl InMemoryChannel {
    pub fn new(capacity: usize, redelivery_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                notify: Notify::new(),
                capacity,
                redelivery_delay,
            }),
        }
    }

    /// Messages waiting to be delivered, including scheduled redeliveries.
    pub fn pending(&self) -> usize {
        let state = self.inner.state();
        state.ready.len() + state.delayed
    }

    /// Deliveries handed out and not yet acked or nacked.
    pub fn in_flight(&self) -> usize {
        self.inner.state().in_flight.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state().closed
    }

    fn requeue(inner: &Inner, envelope: Envelope) {
        let mut state = inner.state();
        state.delayed = state.delayed.saturating_sub(1);
        state.ready.push_front(envelope);
        drop(state);
        inner.notify.notify_one();
    }
}

#[async_trait]
impl MessageChannel for InMemoryChannel {
    async fn publish(&self, payload: String) -> Result<(), QueueError> {
        {
            let mut state = self.inner.state();
            if state.closed {
                return Err(QueueError::Closed);
            }
            let outstanding = state.ready.len() + state.in_flight.len() + state.delayed;
            if outstanding >= self.inner.capacity {
                return Err(QueueError::Full {
                    capacity: self.inner.capacity,
                });
            }
            state.ready.push_back(Envelope {
                payload,
                attempts: 0,
            });
        }
        self.inner.notify.notify_one();
        Ok(())
    }

    async fn receive(&self) -> Result<Delivery, QueueError> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.inner.state();
                if let Some(mut envelope) = state.ready.pop_front() {
                    envelope.attempts += 1;
                    state.next_tag += 1;
                    let tag = state.next_tag;
                    let delivery = Delivery {
                        tag,
                        payload: envelope.payload.clone(),
                        attempt: envelope.attempts,
                    };
                    state.in_flight.insert(tag, envelope);
                    return Ok(delivery);
                }
                if state.closed && state.delayed == 0 && state.in_flight.is_empty() {
                    return Err(QueueError::Closed);
                }
            }

            notified.await;
        }
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<(), QueueError> {
        let mut state = self.inner.state();
        state
            .in_flight
            .remove(&tag)
            .ok_or(QueueError::UnknownDelivery(tag))?;
        let drained = state.closed && state.ready.is_empty() && state.delayed == 0;
        drop(state);
        if drained {
            self.inner.notify.notify_waiters();
        }
        Ok(())
    }

    async fn nack(&self, tag: DeliveryTag) -> Result<(), QueueError> {
        let envelope = {
            let mut state = self.inner.state();
            let envelope = state
                .in_flight
                .remove(&tag)
                .ok_or(QueueError::UnknownDelivery(tag))?;
            state.delayed += 1;
            envelope
        };

        tracing::debug!(
            tag = tag,
            attempt = envelope.attempts,
            delay_ms = self.inner.redelivery_delay.as_millis() as u64,
            "Delivery nacked, scheduling redelivery"
        );

        if self.inner.redelivery_delay.is_zero() {
            Self::requeue(&self.inner, envelope);
        } else {
            let inner = self.inner.clone();
            tokio::spawn(async move {
                tokio::time::sleep(inner.redelivery_delay).await;
                Self::requeue(&inner, envelope);
            });
        }
        Ok(())
    }

    fn close(&self) {
        self.inner.state().closed = true;
        self.inner.notify.notify_waiters();
    }
}
