//! Node API facades.
//!
//! Each namespace client is a thin translator: it builds the method name and
//! positional params, runs them through the shared [`RpcEngine`], and decodes
//! the result into a typed value. Clients are cheap to create and clone.

mod blob;
mod das;
mod fraud;
mod header;
mod p2p;
mod share;
mod state;

pub use blob::{BlobClient, BlobStream};
pub use das::DasClient;
pub use fraud::FraudClient;
pub use header::{HeaderClient, HeaderStream};
pub use p2p::P2PClient;
pub use share::ShareClient;
pub use state::StateClient;

use crate::rpc::RpcEngine;

/// Entry point to the node API namespaces over one connection.
#[derive(Debug, Clone)]
pub struct NodeApi {
    rpc: RpcEngine,
}

impl NodeApi {
    pub fn new(rpc: RpcEngine) -> Self {
        Self { rpc }
    }

    pub fn header(&self) -> HeaderClient {
        HeaderClient::new(self.rpc.clone())
    }

    pub fn state(&self) -> StateClient {
        StateClient::new(self.rpc.clone())
    }

    pub fn blob(&self) -> BlobClient {
        BlobClient::new(self.rpc.clone())
    }

    pub fn share(&self) -> ShareClient {
        ShareClient::new(self.rpc.clone())
    }

    pub fn fraud(&self) -> FraudClient {
        FraudClient::new(self.rpc.clone())
    }

    pub fn p2p(&self) -> P2PClient {
        P2PClient::new(self.rpc.clone())
    }

    pub fn das(&self) -> DasClient {
        DasClient::new(self.rpc.clone())
    }

    /// The engine shared by all namespaces, for methods without a facade.
    pub fn rpc(&self) -> &RpcEngine {
        &self.rpc
    }
}

/// Map a "not found" server error to `None`.
pub(crate) fn optional<T>(result: crate::Result<T>) -> crate::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
