//! Outbound side of a duplex connection.
//!
//! The engine only ever sends through a transport. Inbound messages are fed
//! to the engine by whoever owns the receive side (see
//! [`Dispatcher`](super::Dispatcher)).

use crate::Result;

/// Capability to send one raw message over an open connection.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send a message to the connection.
    async fn send(&self, message: String) -> Result<()>;
}
