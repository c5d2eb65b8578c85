//! Subscription registry and the consumer-side item stream.
//!
//! Every open subscription owns a bounded FIFO queue. Dispatch pushes raw
//! items into it and the [`Subscription`] stream decodes them in arrival
//! order, waking on push. Dropping the stream closes the registry entry, so
//! an early `break`, an error or a cancelled task all release the queue.

use super::engine::Shared;
use crate::Result;
use futures::Stream;
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

/// Consumer end of a subscription queue, produced by [`SubscriptionRegistry::open`].
#[derive(Debug)]
pub struct QueueHandle {
    items: mpsc::Receiver<Value>,
    closed: Arc<AtomicBool>,
}

#[derive(Debug)]
struct QueueEntry {
    sender: mpsc::Sender<Value>,
    closed: Arc<AtomicBool>,
}

impl QueueEntry {
    fn close(self) {
        // Buffered items must not reach the consumer once closed.
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Registry of open subscription queues keyed by subscription id.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    queues: HashMap<String, QueueEntry>,
    capacity: usize,
}

impl SubscriptionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            queues: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Create the delivery queue for a subscription id returned by the server.
    pub fn open(&mut self, id: &str) -> Result<QueueHandle> {
        if self.queues.contains_key(id) {
            return Err(crate::RpcError::Internal(format!(
                "subscription {} is already open",
                id
            )));
        }
        let (sender, items) = mpsc::channel(self.capacity);
        let closed = Arc::new(AtomicBool::new(false));
        self.queues.insert(
            id.to_string(),
            QueueEntry {
                sender,
                closed: closed.clone(),
            },
        );
        debug!(subscription = id, "subscription opened");
        Ok(QueueHandle { items, closed })
    }

    /// Append an item to the queue for `id`.
    ///
    /// Items for unknown (already closed) subscriptions are ignored. Returns
    /// whether the item was queued.
    pub fn push(&mut self, id: &str, item: Value) -> bool {
        let Some(entry) = self.queues.get(id) else {
            trace!(subscription = id, "dropping item for unknown subscription");
            return false;
        };
        match entry.sender.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    subscription = id,
                    capacity = self.capacity,
                    "subscription queue full, dropping item"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                // Consumer went away without closing.
                if let Some(entry) = self.queues.remove(id) {
                    entry.close();
                }
                false
            }
        }
    }

    /// Remove the queue for `id`, discarding undelivered items.
    pub fn close(&mut self, id: &str) -> bool {
        match self.queues.remove(id) {
            Some(entry) => {
                entry.close();
                debug!(subscription = id, "subscription closed");
                true
            }
            None => false,
        }
    }

    /// Close every open subscription. Returns how many were closed.
    pub fn close_all(&mut self) -> usize {
        let closed = self.queues.len();
        for (_, entry) in self.queues.drain() {
            entry.close();
        }
        closed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.queues.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

type Decoder<T> = Box<dyn Fn(Value) -> Result<T> + Send + Sync>;

/// Lazy stream of decoded subscription items.
///
/// Yields items in the order the server pushed them and ends when the
/// connection scope closes. Dropping it closes the subscription.
pub struct Subscription<T> {
    id: String,
    queue: QueueHandle,
    decode: Decoder<T>,
    engine: Weak<Shared>,
    generation: u64,
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        id: String,
        queue: QueueHandle,
        decode: Decoder<T>,
        engine: Weak<Shared>,
        generation: u64,
    ) -> Self {
        Self {
            id,
            queue,
            decode,
            engine,
            generation,
        }
    }

    /// Server-assigned subscription id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the subscription was closed locally or by connection teardown.
    pub fn is_closed(&self) -> bool {
        self.queue.closed.load(Ordering::SeqCst)
    }

    /// Stop delivery without dropping the stream. Items already buffered are
    /// discarded and later pushes for this id are ignored.
    pub fn close(&mut self) {
        self.queue.closed.store(true, Ordering::SeqCst);
        if let Some(engine) = self.engine.upgrade() {
            engine.close_subscription(&self.id, self.generation);
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.queue.closed.load(Ordering::SeqCst) {
            return Poll::Ready(None);
        }
        match this.queue.items.poll_recv(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some((this.decode)(item))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.upgrade() {
            engine.close_subscription(&self.id, self.generation);
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish()
    }
}
