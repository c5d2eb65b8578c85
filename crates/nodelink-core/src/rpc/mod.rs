//! JSON-RPC 2.0 execution engine for one persistent duplex connection.
//!
//! # Architecture
//!
//! - **Codec**: encodes requests and classifies inbound messages
//! - **Pending calls**: in-flight request id → single-assignment reply slot
//! - **Subscriptions**: subscription id → FIFO delivery queue and item stream
//! - **Engine**: `call`, `subscribe_stream`, `dispatch`, and the
//!   attach/detach lifecycle of a connection scope
//! - **Transport**: the send capability the engine needs from a connection

pub mod codec;
pub mod engine;
pub mod pending;
pub mod subscriptions;
pub mod transport;

pub use codec::{
    decode_message, encode_request, ErrorObject, Message, Notification, Response, RpcRequest,
};
pub use engine::{ConnectionScope, Dispatcher, RpcEngine};
pub use pending::{CallKind, PendingCalls, Reply};
pub use subscriptions::{Subscription, SubscriptionRegistry};
pub use transport::Transport;
