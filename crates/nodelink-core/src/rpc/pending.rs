//! Table of in-flight calls awaiting their response.
//!
//! Each entry owns the sending half of a oneshot channel, so a slot can be
//! written at most once: resolving consumes the entry.

use super::subscriptions::QueueHandle;
use crate::config::RpcConfig;
use crate::{Result, RpcError};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;
use tracing::trace;

/// What a resolved slot delivers to the waiting call.
#[derive(Debug)]
pub enum Reply {
    /// Plain call result.
    Value(Value),
    /// A subscribe call whose delivery queue was opened during dispatch.
    Subscription {
        id: String,
        queue: QueueHandle,
        /// Attach generation the queue belongs to.
        generation: u64,
    },
}

/// Receiving half handed to the caller of [`PendingCalls::register`].
pub type ReplySlot = oneshot::Receiver<Result<Reply>>;

/// How a response to this call should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Call,
    Subscribe,
}

/// A registered call, removed from the table before it is resolved.
#[derive(Debug)]
pub struct PendingCall {
    id: String,
    kind: CallKind,
    slot: oneshot::Sender<Result<Reply>>,
}

impl PendingCall {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    /// Whether the caller stopped waiting for this call.
    pub fn is_abandoned(&self) -> bool {
        self.slot.is_closed()
    }

    /// Deliver the reply. A caller that already went away is not an error.
    pub fn resolve(self, reply: Reply) {
        if self.slot.send(Ok(reply)).is_err() {
            trace!(id = %self.id, "pending call dropped before its reply arrived");
        }
    }

    /// Deliver a failure.
    pub fn fail(self, error: RpcError) {
        if self.slot.send(Err(error)).is_err() {
            trace!(id = %self.id, "pending call dropped before its failure arrived");
        }
    }
}

/// Pending-call table keyed by request id.
#[derive(Debug, Default)]
pub struct PendingCalls {
    calls: HashMap<String, PendingCall>,
    abandoned: VecDeque<String>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh slot for `id`.
    pub fn register(&mut self, id: &str, kind: CallKind) -> Result<ReplySlot> {
        if self.calls.contains_key(id) {
            return Err(RpcError::Internal(format!(
                "request id {} is already pending",
                id
            )));
        }
        let (slot, receiver) = oneshot::channel();
        self.calls.insert(
            id.to_string(),
            PendingCall {
                id: id.to_string(),
                kind,
                slot,
            },
        );
        Ok(receiver)
    }

    /// Remove the entry for a response id.
    ///
    /// Returns `Ok(None)` for a call that was cancelled while waiting, and
    /// `UnmatchedResponseId` for an id this table never issued.
    pub fn take(&mut self, id: &str) -> Result<Option<PendingCall>> {
        if let Some(call) = self.calls.remove(id) {
            return Ok(Some(call));
        }
        if let Some(position) = self.abandoned.iter().position(|abandoned| abandoned == id) {
            self.abandoned.remove(position);
            trace!(id, "ignoring late response for cancelled call");
            return Ok(None);
        }
        Err(RpcError::UnmatchedResponseId { id: id.to_string() })
    }

    /// Resolve the call registered under `id` with a plain value.
    pub fn resolve(&mut self, id: &str, value: Value) -> Result<()> {
        if let Some(call) = self.take(id)? {
            call.resolve(Reply::Value(value));
        }
        Ok(())
    }

    /// Fail the call registered under `id`.
    pub fn fail(&mut self, id: &str, error: RpcError) -> Result<()> {
        if let Some(call) = self.take(id)? {
            call.fail(error);
        }
        Ok(())
    }

    /// Drop an entry that will never see a response (the request was not sent).
    pub fn remove(&mut self, id: &str) -> bool {
        self.calls.remove(id).is_some()
    }

    /// Forget a call whose caller stopped waiting (cancellation or timeout).
    ///
    /// A response that still arrives for `id` will be ignored once.
    pub fn cancel(&mut self, id: &str) -> bool {
        if self.calls.remove(id).is_none() {
            return false;
        }
        if self.abandoned.len() >= RpcConfig::ABANDONED_ID_LIMIT {
            self.abandoned.pop_front();
        }
        self.abandoned.push_back(id.to_string());
        true
    }

    /// Fail every pending call with `ConnectionClosed` and clear the table.
    ///
    /// Returns how many calls were failed.
    pub fn drain_all_with_error(&mut self) -> usize {
        let drained = self.calls.len();
        for (_, call) in self.calls.drain() {
            call.fail(RpcError::ConnectionClosed);
        }
        self.abandoned.clear();
        drained
    }

    pub fn contains(&self, id: &str) -> bool {
        self.calls.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
