//! Correlation engine and connection scope.
//!
//! The engine owns the pending-call table and the subscription registry and
//! matches every inbound message against them. A [`ConnectionScope`] marks the
//! lifetime of one attached transport: when it ends (explicitly, on drop, or
//! because the listener hit a fatal error) every pending call fails with
//! `ConnectionClosed` and every subscription stream ends.
//!
//! # Thread Safety
//!
//! All engine state sits behind one `std::sync::Mutex`. The lock is only held
//! for bounded, synchronous table updates and never across an `.await`, so
//! `dispatch` can run on the listener task while calls are issued from
//! any number of other tasks.

use super::codec::{self, normalize_id, Message};
use super::pending::{CallKind, PendingCalls, Reply, ReplySlot};
use super::subscriptions::{Subscription, SubscriptionRegistry};
use super::transport::Transport;
use crate::config::EngineConfig;
use crate::{Result, RpcError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};
use uuid::Uuid;

struct EngineState {
    transport: Option<Arc<dyn Transport>>,
    /// Incremented on every attach.
    generation: u64,
    pending: PendingCalls,
    subscriptions: SubscriptionRegistry,
}

pub(crate) struct Shared {
    state: Mutex<EngineState>,
    config: EngineConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        // Table updates never leave the state half-written, so a panic in
        // another holder does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn close_subscription(&self, id: &str, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation {
            state.subscriptions.close(id);
        }
    }

    fn detach(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation || state.transport.is_none() {
            return false;
        }
        state.transport = None;
        let failed = state.pending.drain_all_with_error();
        let closed = state.subscriptions.close_all();
        debug!(
            generation,
            failed_calls = failed,
            closed_subscriptions = closed,
            "transport detached"
        );
        true
    }

    fn dispatch(&self, generation: Option<u64>, raw: &str) -> Result<()> {
        let message = codec::decode_message(raw)?;

        let mut state = self.lock();
        if state.transport.is_none() || generation.is_some_and(|g| g != state.generation) {
            return Err(RpcError::NotAttached);
        }

        match message {
            Message::Notification(notification) => {
                trace!(
                    method = %notification.method,
                    subscription = %notification.subscription_id,
                    "notification"
                );
                state
                    .subscriptions
                    .push(&notification.subscription_id, notification.item);
                Ok(())
            }
            Message::Response(response) => {
                let Some(call) = state.pending.take(&response.id)? else {
                    return Ok(());
                };
                trace!(id = %response.id, ok = response.outcome.is_ok(), "response");

                match (call.kind(), response.outcome) {
                    (_, Err(error)) => call.fail(error.into()),
                    (CallKind::Call, Ok(value)) => call.resolve(Reply::Value(value)),
                    (CallKind::Subscribe, Ok(value)) => {
                        if call.is_abandoned() {
                            return Ok(());
                        }
                        let Some(subscription_id) = normalize_id(&value) else {
                            call.fail(RpcError::decode(format!(
                                "subscription id must be a string or integer, got {}",
                                value
                            )));
                            return Ok(());
                        };
                        // Opened here, under the same lock, so items pushed
                        // right after this response are not lost.
                        match state.subscriptions.open(&subscription_id) {
                            Ok(queue) => call.resolve(Reply::Subscription {
                                id: subscription_id,
                                queue,
                                generation: state.generation,
                            }),
                            Err(error) => call.fail(error),
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// Owns the reply slot of a registered call. If the call's future is dropped
/// or times out before the reply is consumed, the table entry is cancelled
/// and a subscription opened by a reply that was never read is closed.
struct PendingGuard<'a> {
    shared: &'a Shared,
    id: &'a str,
    slot: ReplySlot,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.shared.lock().pending.cancel(self.id) {
            trace!(id = self.id, "pending call cancelled");
        }

        // Dispatch may already have resolved the slot.
        self.slot.close();
        if let Ok(Ok(Reply::Subscription { id, generation, .. })) = self.slot.try_recv() {
            trace!(subscription = %id, "closing unclaimed subscription");
            self.shared.close_subscription(&id, generation);
        }
    }
}

/// JSON-RPC correlation engine.
///
/// Cheap to clone; clones share the same tables.
#[derive(Clone)]
pub struct RpcEngine {
    shared: Arc<Shared>,
}

impl RpcEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState {
                    transport: None,
                    generation: 0,
                    pending: PendingCalls::new(),
                    subscriptions: SubscriptionRegistry::new(config.subscription_capacity),
                }),
                config,
            }),
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.shared.config
    }

    /// Attach a transport and open a connection scope.
    ///
    /// Fails with `AlreadyAttached` while another scope is live.
    pub fn attach(&self, transport: Arc<dyn Transport>) -> Result<ConnectionScope> {
        let mut state = self.shared.lock();
        if state.transport.is_some() {
            return Err(RpcError::AlreadyAttached);
        }
        state.generation += 1;
        state.transport = Some(transport);
        let generation = state.generation;
        debug!(generation, "transport attached");

        Ok(ConnectionScope {
            engine: self.clone(),
            generation,
            detached: false,
        })
    }

    pub fn is_attached(&self) -> bool {
        self.shared.lock().transport.is_some()
    }

    /// Number of calls still waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Number of open subscription queues.
    pub fn open_subscriptions(&self) -> usize {
        self.shared.lock().subscriptions.len()
    }

    /// Call `method` and convert the raw result with `decode`.
    ///
    /// Fails with `NotAttached` without sending anything when no transport is
    /// attached, with `RemoteCallFailed` when the server returns an error
    /// object, and with `Timeout` after the configured response timeout.
    pub async fn call<T, F>(&self, method: &str, params: Vec<Value>, decode: F) -> Result<T>
    where
        F: FnOnce(Value) -> Result<T>,
    {
        match self.request(method, params, CallKind::Call).await? {
            Reply::Value(value) => decode(value),
            Reply::Subscription { id, .. } => Err(RpcError::Internal(format!(
                "call {} resolved as subscription {}",
                method, id
            ))),
        }
    }

    /// Call `method` and deserialize the result into `T`.
    pub async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T> {
        self.call(method, params, decode_json).await
    }

    /// Open a server subscription and stream its items through `decode`.
    ///
    /// The initial call returns the subscription id; the returned stream
    /// yields every item pushed for that id until it is dropped or the
    /// connection scope closes.
    pub async fn subscribe_stream<T, F>(
        &self,
        method: &str,
        params: Vec<Value>,
        decode: F,
    ) -> Result<Subscription<T>>
    where
        F: Fn(Value) -> Result<T> + Send + Sync + 'static,
    {
        match self.request(method, params, CallKind::Subscribe).await? {
            Reply::Subscription {
                id,
                queue,
                generation,
            } => Ok(Subscription::new(
                id,
                queue,
                Box::new(decode),
                Arc::downgrade(&self.shared),
                generation,
            )),
            Reply::Value(_) => Err(RpcError::Internal(format!(
                "subscribe {} resolved without a subscription",
                method
            ))),
        }
    }

    /// Open a server subscription whose items deserialize into `T`.
    pub async fn subscribe_typed<T: DeserializeOwned + 'static>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Subscription<T>> {
        self.subscribe_stream(method, params, decode_json).await
    }

    /// Route one raw inbound message to its call or subscription.
    ///
    /// `MalformedMessage` means the message was dropped; `UnmatchedResponseId`
    /// means the connection is out of sync and should be torn down.
    pub fn dispatch(&self, raw: &str) -> Result<()> {
        self.shared.dispatch(None, raw)
    }

    async fn request(&self, method: &str, params: Vec<Value>, kind: CallKind) -> Result<Reply> {
        let id = Uuid::new_v4().to_string();
        let payload = codec::encode_request(method, params, &id)?;

        let (transport, slot) = {
            let mut state = self.shared.lock();
            let transport = state.transport.clone().ok_or(RpcError::NotAttached)?;
            let slot = state.pending.register(&id, kind)?;
            (transport, slot)
        };
        let mut guard = PendingGuard {
            shared: &self.shared,
            id: &id,
            slot,
            armed: true,
        };

        debug!(%id, method, "sending request");
        if let Err(error) = transport.send(payload).await {
            guard.disarm();
            self.shared.lock().pending.remove(&id);
            return Err(error);
        }

        let timeout = self.shared.config.response_timeout;
        let outcome = tokio::time::timeout(timeout, &mut guard.slot).await;
        match outcome {
            Ok(Ok(reply)) => {
                guard.disarm();
                reply
            }
            // The slot was dropped without being written: table torn down.
            Ok(Err(_)) => {
                guard.disarm();
                Err(RpcError::ConnectionClosed)
            }
            Err(_) => {
                warn!(%id, method, ?timeout, "request timed out");
                Err(RpcError::Timeout(timeout))
            }
        }
    }
}

impl Default for RpcEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for RpcEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("RpcEngine")
            .field("attached", &state.transport.is_some())
            .field("generation", &state.generation)
            .field("pending", &state.pending.len())
            .field("subscriptions", &state.subscriptions.len())
            .finish()
    }
}

fn decode_json<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(RpcError::decode)
}

/// Lifetime of one attached transport.
///
/// Detaches on drop if [`detach`](Self::detach) was not called.
#[derive(Debug)]
pub struct ConnectionScope {
    engine: RpcEngine,
    generation: u64,
    detached: bool,
}

impl ConnectionScope {
    pub fn engine(&self) -> &RpcEngine {
        &self.engine
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this scope still owns the attached transport.
    pub fn is_attached(&self) -> bool {
        let state = self.engine.shared.lock();
        state.generation == self.generation && state.transport.is_some()
    }

    /// Handle for the listener loop that owns the receive side.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            shared: Arc::downgrade(&self.engine.shared),
            generation: self.generation,
        }
    }

    /// Detach the transport, fail pending calls and close subscriptions.
    ///
    /// Returns `false` if the listener already detached this scope.
    pub fn detach(mut self) -> bool {
        self.detached = true;
        self.engine.shared.detach(self.generation)
    }
}

impl Drop for ConnectionScope {
    fn drop(&mut self) {
        if !self.detached {
            self.engine.shared.detach(self.generation);
        }
    }
}

/// Inbound entry point bound to one connection scope.
///
/// Messages handed to a dispatcher whose scope has ended are rejected with
/// `NotAttached` instead of leaking into a later connection.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    shared: std::sync::Weak<Shared>,
    generation: u64,
}

impl Dispatcher {
    pub fn dispatch(&self, raw: &str) -> Result<()> {
        match self.shared.upgrade() {
            Some(shared) => shared.dispatch(Some(self.generation), raw),
            None => Err(RpcError::NotAttached),
        }
    }

    /// Tear the scope down from the receive side (transport error or close).
    pub fn detach(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.detach(self.generation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Transport that hands every sent message to the test.
    struct ChannelTransport {
        sent: mpsc::UnboundedSender<String>,
    }

    #[async_trait::async_trait]
    impl Transport for ChannelTransport {
        async fn send(&self, message: String) -> Result<()> {
            self.sent
                .send(message)
                .map_err(|_| RpcError::Transport {
                    message: "test receiver dropped".into(),
                })
        }
    }

    struct FailingTransport;

    #[async_trait::async_trait]
    impl Transport for FailingTransport {
        async fn send(&self, _message: String) -> Result<()> {
            Err(RpcError::Transport {
                message: "socket closed".into(),
            })
        }
    }

    fn attached(
        config: EngineConfig,
    ) -> (RpcEngine, ConnectionScope, mpsc::UnboundedReceiver<String>) {
        let engine = RpcEngine::new(config);
        let (tx, rx) = mpsc::unbounded_channel();
        let scope = engine.attach(Arc::new(ChannelTransport { sent: tx })).unwrap();
        (engine, scope, rx)
    }

    async fn next_request_id(sent: &mut mpsc::UnboundedReceiver<String>) -> String {
        let raw = sent.recv().await.unwrap();
        let request: codec::RpcRequest = serde_json::from_str(&raw).unwrap();
        request.id
    }

    #[tokio::test]
    async fn test_call_resolves_with_decoded_result() {
        let (engine, _scope, mut sent) = attached(EngineConfig::default());

        let caller = engine.clone();
        let call = tokio::spawn(async move {
            caller
                .call_typed::<i64>("svc.Method", vec![json!(1), json!("x")])
                .await
        });

        let id = next_request_id(&mut sent).await;
        engine
            .dispatch(&json!({"id": id, "result": 42}).to_string())
            .unwrap();

        assert_eq!(call.await.unwrap().unwrap(), 42);
        assert_eq!(engine.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_call_without_transport_fails_fast() {
        let engine = RpcEngine::default();
        let result = engine.call_typed::<Value>("header.LocalHead", vec![]).await;

        assert!(matches!(result, Err(RpcError::NotAttached)));
        assert_eq!(engine.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_leaves_no_pending_entry() {
        let engine = RpcEngine::default();
        let _scope = engine.attach(Arc::new(FailingTransport)).unwrap();

        let result = engine.call_typed::<Value>("p2p.Info", vec![]).await;

        assert!(matches!(result, Err(RpcError::Transport { .. })));
        assert_eq!(engine.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_second_attach_rejected() {
        let (engine, _scope, _sent) = attached(EngineConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = engine.attach(Arc::new(ChannelTransport { sent: tx }));
        assert!(matches!(result, Err(RpcError::AlreadyAttached)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_removes_pending_entry_and_tolerates_late_reply() {
        let config = EngineConfig::default().with_response_timeout(Duration::from_secs(5));
        let (engine, _scope, mut sent) = attached(config);

        let caller = engine.clone();
        let call =
            tokio::spawn(async move {
                caller.call_typed::<Value>("das.WaitCatchUp", vec![]).await
            });

        let id = next_request_id(&mut sent).await;
        let result = call.await.unwrap();

        assert!(matches!(result, Err(RpcError::Timeout(_))));
        assert_eq!(engine.pending_calls(), 0);
        assert!(engine
            .dispatch(&json!({"id": id, "result": null}).to_string())
            .is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_call_is_removed() {
        let (engine, _scope, mut sent) = attached(EngineConfig::default());

        let caller = engine.clone();
        let call =
            tokio::spawn(async move {
                caller.call_typed::<Value>("header.SyncWait", vec![]).await
            });

        let id = next_request_id(&mut sent).await;
        assert_eq!(engine.pending_calls(), 1);

        call.abort();
        assert!(call.await.unwrap_err().is_cancelled());

        assert_eq!(engine.pending_calls(), 0);
        assert!(engine
            .dispatch(&json!({"id": id, "result": null}).to_string())
            .is_ok());
    }

    #[tokio::test]
    async fn test_subscribe_dropped_after_reply_closes_queue() {
        let (engine, _scope, mut sent) = attached(EngineConfig::default());

        let caller = engine.clone();
        let subscribe = tokio::spawn(async move {
            caller.subscribe_typed::<i64>("header.Subscribe", vec![]).await
        });
        let id = next_request_id(&mut sent).await;

        // The reply opens the queue, but the task never gets to read it.
        engine
            .dispatch(&json!({"id": id, "result": "s1"}).to_string())
            .unwrap();
        assert_eq!(engine.open_subscriptions(), 1);

        subscribe.abort();
        assert!(subscribe.await.unwrap_err().is_cancelled());

        assert_eq!(engine.pending_calls(), 0);
        assert_eq!(engine.open_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_detach_fails_pending_calls_and_ends_streams() {
        let (engine, scope, mut sent) = attached(EngineConfig::default());

        let caller = engine.clone();
        let subscribe = tokio::spawn(async move {
            caller.subscribe_typed::<i64>("header.Subscribe", vec![]).await
        });
        let sub_id = next_request_id(&mut sent).await;
        engine
            .dispatch(&json!({"id": sub_id, "result": "s1"}).to_string())
            .unwrap();
        let mut stream = subscribe.await.unwrap().unwrap();

        let caller = engine.clone();
        let call =
            tokio::spawn(async move {
                caller.call_typed::<Value>("header.SyncWait", vec![]).await
            });
        next_request_id(&mut sent).await;

        assert!(scope.detach());

        assert!(matches!(
            call.await.unwrap(),
            Err(RpcError::ConnectionClosed)
        ));
        assert!(stream.next().await.is_none());
        assert_eq!(engine.pending_calls(), 0);
        assert_eq!(engine.open_subscriptions(), 0);
        assert!(!engine.is_attached());
    }

    #[tokio::test]
    async fn test_dispatcher_detach_runs_once() {
        let (engine, scope, _sent) = attached(EngineConfig::default());
        let dispatcher = scope.dispatcher();

        assert!(dispatcher.detach());
        assert!(!dispatcher.detach());
        assert!(!scope.detach());
        assert!(!engine.is_attached());
    }

    #[tokio::test]
    async fn test_stale_dispatcher_cannot_touch_new_scope() {
        let (engine, scope, _sent) = attached(EngineConfig::default());
        let stale = scope.dispatcher();
        drop(scope);

        let (tx, _rx) = mpsc::unbounded_channel();
        let fresh = engine.attach(Arc::new(ChannelTransport { sent: tx })).unwrap();

        assert!(!stale.detach());
        assert!(fresh.is_attached());
        assert!(matches!(
            stale.dispatch(r#"{"method":"x","params":["s",1]}"#),
            Err(RpcError::NotAttached)
        ));
    }

    #[tokio::test]
    async fn test_unmatched_response_is_reported() {
        let (engine, _scope, _sent) = attached(EngineConfig::default());

        let err = engine
            .dispatch(r#"{"id":"nobody","result":1}"#)
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
