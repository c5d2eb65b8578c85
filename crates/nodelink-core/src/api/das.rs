//! `das` namespace: data availability sampling.

use crate::rpc::RpcEngine;
use crate::types::SamplingStats;
use crate::Result;

#[derive(Debug, Clone)]
pub struct DasClient {
    rpc: RpcEngine,
}

impl DasClient {
    pub(crate) fn new(rpc: RpcEngine) -> Self {
        Self { rpc }
    }

    /// Current statistics over the sampling process.
    pub async fn sampling_stats(&self) -> Result<SamplingStats> {
        self.rpc.call_typed("das.SamplingStats", vec![]).await
    }

    /// Block until the sampler catches up to the network head.
    pub async fn wait_catch_up(&self) -> Result<()> {
        self.rpc.call("das.WaitCatchUp", vec![], |_| Ok(())).await
    }
}
