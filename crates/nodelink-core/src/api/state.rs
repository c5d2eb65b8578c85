//! `state` namespace: account address and balances.

use crate::rpc::RpcEngine;
use crate::types::Balance;
use crate::Result;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct StateClient {
    rpc: RpcEngine,
}

impl StateClient {
    pub(crate) fn new(rpc: RpcEngine) -> Self {
        Self { rpc }
    }

    /// Address of the node's account/signer.
    pub async fn account_address(&self) -> Result<String> {
        self.rpc.call_typed("state.AccountAddress", vec![]).await
    }

    /// Balance of the node's account, verified against the block's AppHash.
    pub async fn balance(&self) -> Result<Balance> {
        self.rpc.call_typed("state.Balance", vec![]).await
    }

    /// Balance of `address`, verified against the block's AppHash.
    pub async fn balance_for_address(&self, address: &str) -> Result<Balance> {
        self.rpc
            .call_typed("state.BalanceForAddress", vec![json!(address)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedNode;
    use crate::RpcError;

    #[tokio::test]
    async fn test_balance_for_address() {
        let (node, _scope) = ScriptedNode::start();
        node.on("state.BalanceForAddress", |params| {
            assert_eq!(params, &[json!("celestia1xyz")][..]);
            Ok(json!({"amount": "250", "denom": "utia"}))
        });

        let balance = StateClient::new(node.engine())
            .balance_for_address("celestia1xyz")
            .await
            .unwrap();
        assert_eq!(balance.amount, 250);
    }

    #[tokio::test]
    async fn test_remote_error_is_surfaced() {
        let (node, _scope) = ScriptedNode::start();
        node.on("state.Balance", |_| Err((-32000, "no signer".to_string())));

        match StateClient::new(node.engine()).balance().await {
            Err(RpcError::RemoteCallFailed { code, message, .. }) => {
                assert_eq!(code, -32000);
                assert_eq!(message, "no signer");
            }
            other => panic!("Expected RemoteCallFailed, got: {:?}", other),
        }
    }
}
