//! `header` namespace: extended headers and syncer state.

use super::optional;
use crate::rpc::RpcEngine;
use crate::types::{ExtendedHeader, SyncState};
use crate::Result;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{json, Value};

/// Stream of headers produced by [`HeaderClient::subscribe`].
pub type HeaderStream = BoxStream<'static, Result<ExtendedHeader>>;

#[derive(Debug, Clone)]
pub struct HeaderClient {
    rpc: RpcEngine,
}

impl HeaderClient {
    pub(crate) fn new(rpc: RpcEngine) -> Self {
        Self { rpc }
    }

    /// Header with the given hash from the node's store, if present.
    pub async fn get_by_hash(&self, hash: &str) -> Result<Option<ExtendedHeader>> {
        optional(
            self.rpc
                .call("header.GetByHash", vec![json!(hash)], ExtendedHeader::from_value)
                .await,
        )
    }

    /// Header at `height`, if it is currently available.
    pub async fn get_by_height(&self, height: u64) -> Result<ExtendedHeader> {
        self.rpc
            .call("header.GetByHeight", vec![json!(height)], ExtendedHeader::from_value)
            .await
    }

    /// Verified, adjacent headers after `from` up to height `to`.
    pub async fn get_range_by_height(
        &self,
        from: &ExtendedHeader,
        to: u64,
    ) -> Result<Vec<ExtendedHeader>> {
        let headers: Option<Vec<ExtendedHeader>> = self
            .rpc
            .call_typed("header.GetRangeByHeight", vec![from.raw().clone(), json!(to)])
            .await?;
        Ok(headers.unwrap_or_default())
    }

    /// Header of the local chain head.
    pub async fn local_head(&self) -> Result<ExtendedHeader> {
        self.rpc
            .call("header.LocalHead", vec![], ExtendedHeader::from_value)
            .await
    }

    /// The syncer's view of the network head.
    pub async fn network_head(&self) -> Result<ExtendedHeader> {
        self.rpc
            .call("header.NetworkHead", vec![], ExtendedHeader::from_value)
            .await
    }

    pub async fn sync_state(&self) -> Result<SyncState> {
        self.rpc.call_typed("header.SyncState", vec![]).await
    }

    /// Block until the syncer reaches the network head.
    pub async fn sync_wait(&self) -> Result<()> {
        self.rpc.call("header.SyncWait", vec![], |_| Ok(())).await
    }

    /// Block until the header at `height` has been processed.
    pub async fn wait_for_height(&self, height: u64) -> Result<ExtendedHeader> {
        self.rpc
            .call("header.WaitForHeight", vec![json!(height)], ExtendedHeader::from_value)
            .await
    }

    /// Subscribe to new headers as the node receives them.
    ///
    /// Empty (`null`) items are skipped.
    pub async fn subscribe(&self) -> Result<HeaderStream> {
        let subscription = self
            .rpc
            .subscribe_stream("header.Subscribe", vec![], decode_optional_header)
            .await?;
        Ok(subscription
            .filter_map(|item| futures::future::ready(item.transpose()))
            .boxed())
    }
}

fn decode_optional_header(value: Value) -> Result<Option<ExtendedHeader>> {
    if value.is_null() {
        return Ok(None);
    }
    ExtendedHeader::from_value(value).map(Some)
}
