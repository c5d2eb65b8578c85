//! `fraud` namespace: stored and gossiped fraud proofs.
//!
//! Proofs are kept as raw JSON; their shape depends on the proof type.

use crate::rpc::{RpcEngine, Subscription};
use crate::Result;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct FraudClient {
    rpc: RpcEngine,
}

impl FraudClient {
    pub(crate) fn new(rpc: RpcEngine) -> Self {
        Self { rpc }
    }

    /// Fraud proofs of `proof_type` stored by the node.
    pub async fn get(&self, proof_type: &str) -> Result<Vec<Value>> {
        let proofs: Option<Vec<Value>> = self
            .rpc
            .call_typed("fraud.Get", vec![json!(proof_type)])
            .await?;
        Ok(proofs.unwrap_or_default())
    }

    /// Follow the pubsub topic for `proof_type`.
    pub async fn subscribe(&self, proof_type: &str) -> Result<Subscription<Value>> {
        self.rpc
            .subscribe_typed("fraud.Subscribe", vec![json!(proof_type)])
            .await
    }
}
