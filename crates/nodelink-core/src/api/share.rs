//! `share` namespace: raw shares and the extended data square.

use crate::rpc::RpcEngine;
use crate::types::{
    ExtendedDataSquare, ExtendedHeader, GetRangeResult, Namespace, NamespaceData, Sample,
    SampleCoords,
};
use crate::Result;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct ShareClient {
    rpc: RpcEngine,
}

impl ShareClient {
    pub(crate) fn new(rpc: RpcEngine) -> Self {
        Self { rpc }
    }

    /// Full extended data square at `height`.
    pub async fn get_eds(&self, height: u64) -> Result<ExtendedDataSquare> {
        self.rpc.call_typed("share.GetEDS", vec![json!(height)]).await
    }

    /// All shares of `namespace` at `height`, row by row.
    pub async fn get_namespace_data(
        &self,
        height: u64,
        namespace: &Namespace,
    ) -> Result<Vec<NamespaceData>> {
        let data: Option<Vec<NamespaceData>> = self
            .rpc
            .call_typed(
                "share.GetNamespaceData",
                vec![json!(height), serde_json::to_value(namespace)?],
            )
            .await?;
        Ok(data.unwrap_or_default())
    }

    /// Shares `start..end` at `height` with their proof.
    pub async fn get_range(&self, height: u64, start: u64, end: u64) -> Result<GetRangeResult> {
        self.rpc
            .call_typed("share.GetRange", vec![json!(height), json!(start), json!(end)])
            .await
    }

    /// Samples at `indices` of the square committed to by `header`.
    pub async fn get_samples(
        &self,
        header: &ExtendedHeader,
        indices: &[SampleCoords],
    ) -> Result<Vec<Sample>> {
        let samples: Option<Vec<Sample>> = self
            .rpc
            .call_typed(
                "share.GetSamples",
                vec![header.raw().clone(), serde_json::to_value(indices)?],
            )
            .await?;
        Ok(samples.unwrap_or_default())
    }

    /// Share at `row`, `col` of the square at `height`.
    pub async fn get_share(&self, height: u64, row: u64, col: u64) -> Result<Sample> {
        self.rpc
            .call_typed("share.GetShare", vec![json!(height), json!(row), json!(col)])
            .await
    }

    /// Succeeds if the shares at `height` are available on the network.
    pub async fn shares_available(&self, height: u64) -> Result<()> {
        self.rpc
            .call("share.SharesAvailable", vec![json!(height)], |_| Ok(()))
            .await
    }
}
