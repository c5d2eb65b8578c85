//! `p2p` namespace: peers, bandwidth and connection management.

use crate::rpc::RpcEngine;
use crate::types::{
    AddrInfo, BandwidthStats, Connectedness, PeerId, Reachability, ResourceManagerStat,
};
use crate::Result;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct P2PClient {
    rpc: RpcEngine,
}

impl P2PClient {
    pub(crate) fn new(rpc: RpcEngine) -> Self {
        Self { rpc }
    }

    /// Bandwidth metrics for all traffic exchanged with `peer_id`.
    pub async fn bandwidth_for_peer(&self, peer_id: &str) -> Result<BandwidthStats> {
        self.rpc
            .call_typed("p2p.BandwidthForPeer", vec![json!(peer_id)])
            .await
    }

    /// Bandwidth metrics for one protocol id.
    pub async fn bandwidth_for_protocol(&self, protocol_id: &str) -> Result<BandwidthStats> {
        self.rpc
            .call_typed("p2p.BandwidthForProtocol", vec![json!(protocol_id)])
            .await
    }

    /// Bandwidth metrics for everything the local peer sent and received.
    pub async fn bandwidth_stats(&self) -> Result<BandwidthStats> {
        self.rpc.call_typed("p2p.BandwidthStats", vec![]).await
    }

    /// Block a peer and close any existing connection to it.
    pub async fn block_peer(&self, peer_id: &str) -> Result<()> {
        self.call_unit("p2p.BlockPeer", vec![json!(peer_id)]).await
    }

    pub async fn unblock_peer(&self, peer_id: &str) -> Result<()> {
        self.call_unit("p2p.UnblockPeer", vec![json!(peer_id)]).await
    }

    pub async fn list_blocked_peers(&self) -> Result<Vec<PeerId>> {
        self.call_list("p2p.ListBlockedPeers", vec![]).await
    }

    pub async fn close_peer(&self, peer_id: &str) -> Result<()> {
        self.call_unit("p2p.ClosePeer", vec![json!(peer_id)]).await
    }

    /// Ensure there is a connection to the given peer.
    pub async fn connect(&self, address: &AddrInfo) -> Result<()> {
        self.call_unit("p2p.Connect", vec![serde_json::to_value(address)?])
            .await
    }

    pub async fn connectedness(&self, peer_id: &str) -> Result<Connectedness> {
        self.rpc
            .call_typed("p2p.Connectedness", vec![json!(peer_id)])
            .await
    }

    /// Address information about the local host.
    pub async fn info(&self) -> Result<AddrInfo> {
        self.rpc.call_typed("p2p.Info", vec![]).await
    }

    pub async fn is_protected(&self, peer_id: &str, tag: &str) -> Result<bool> {
        self.rpc
            .call_typed("p2p.IsProtected", vec![json!(peer_id), json!(tag)])
            .await
    }

    pub async fn nat_status(&self) -> Result<Reachability> {
        self.rpc.call_typed("p2p.NATStatus", vec![]).await
    }

    /// What the peerstore knows about `peer_id`.
    pub async fn peer_info(&self, peer_id: &str) -> Result<AddrInfo> {
        self.rpc
            .call_typed("p2p.PeerInfo", vec![json!(peer_id)])
            .await
    }

    /// Connected peers.
    pub async fn peers(&self) -> Result<Vec<PeerId>> {
        self.call_list("p2p.Peers", vec![]).await
    }

    /// Protect a peer from being trimmed, dropped or negatively scored.
    pub async fn protect(&self, peer_id: &str, tag: &str) -> Result<()> {
        self.call_unit("p2p.Protect", vec![json!(peer_id), json!(tag)])
            .await
    }

    /// Remove protection; returns whether the peer is still protected by
    /// another tag.
    pub async fn unprotect(&self, peer_id: &str, tag: &str) -> Result<bool> {
        self.rpc
            .call_typed("p2p.Unprotect", vec![json!(peer_id), json!(tag)])
            .await
    }

    /// Peers joined on a pubsub topic.
    pub async fn pub_sub_peers(&self, topic: &str) -> Result<Vec<PeerId>> {
        self.call_list("p2p.PubSubPeers", vec![json!(topic)]).await
    }

    pub async fn pub_sub_topics(&self) -> Result<Vec<String>> {
        self.call_list("p2p.PubSubTopics", vec![]).await
    }

    pub async fn resource_state(&self) -> Result<ResourceManagerStat> {
        self.rpc.call_typed("p2p.ResourceState", vec![]).await
    }

    async fn call_unit(&self, method: &str, params: Vec<serde_json::Value>) -> Result<()> {
        self.rpc.call(method, params, |_| Ok(())).await
    }

    // The node encodes an empty list as `null`.
    async fn call_list<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<Vec<T>> {
        let list: Option<Vec<T>> = self.rpc.call_typed(method, params).await?;
        Ok(list.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedNode;

    #[tokio::test]
    async fn test_info() {
        let (node, _scope) = ScriptedNode::start();
        node.on("p2p.Info", |_| Ok(json!({"ID": "12D3Koo", "Addrs": []})));

        let info = P2PClient::new(node.engine()).info().await.unwrap();
        assert_eq!(info.id, "12D3Koo");
    }

    #[tokio::test]
    async fn test_null_peer_list_is_empty() {
        let (node, _scope) = ScriptedNode::start();
        node.on("p2p.Peers", |_| Ok(serde_json::Value::Null));

        let peers = P2PClient::new(node.engine()).peers().await.unwrap();
        assert!(peers.is_empty());
    }

    #[tokio::test]
    async fn test_protect_sends_positional_params() {
        let (node, _scope) = ScriptedNode::start();
        node.on("p2p.Protect", |_| Ok(serde_json::Value::Null));

        P2PClient::new(node.engine())
            .protect("peer-a", "bootstrap")
            .await
            .unwrap();

        let requests = node.requests.lock().unwrap();
        assert_eq!(requests[0].method, "p2p.Protect");
        assert_eq!(requests[0].params, vec![json!("peer-a"), json!("bootstrap")]);
    }

    #[tokio::test]
    async fn test_nat_status() {
        let (node, _scope) = ScriptedNode::start();
        node.on("p2p.NATStatus", |_| Ok(json!(1)));

        let status = P2PClient::new(node.engine()).nat_status().await.unwrap();
        assert_eq!(status, Reachability::Public);
    }

    #[tokio::test]
    async fn test_connect_sends_addr_info() {
        let (node, _scope) = ScriptedNode::start();
        node.on("p2p.Connect", |params| {
            assert_eq!(
                params[0],
                json!({"ID": "12D3Koo", "Addrs": ["/ip4/1.2.3.4/tcp/2121"]})
            );
            Ok(serde_json::Value::Null)
        });

        let peer = AddrInfo {
            id: "12D3Koo".to_string(),
            addrs: vec!["/ip4/1.2.3.4/tcp/2121".to_string()],
        };
        P2PClient::new(node.engine()).connect(&peer).await.unwrap();
        assert_eq!(node.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resource_state() {
        let (node, _scope) = ScriptedNode::start();
        node.on("p2p.ResourceState", |_| {
            Ok(json!({
                "System": {"NumConnsInbound": 4},
                "Transient": {},
                "Services": null,
                "Protocols": {},
                "Peers": {}
            }))
        });

        let stat = P2PClient::new(node.engine()).resource_state().await.unwrap();
        assert_eq!(stat.system["NumConnsInbound"], json!(4));
        assert!(stat.services.is_null());
    }
}
