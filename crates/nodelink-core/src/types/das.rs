//! Data availability sampling statistics.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub job_type: String,
    pub current: u64,
    pub from: u64,
    pub to: u64,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingStats {
    pub head_of_sampled_chain: u64,
    pub head_of_catchup: u64,
    pub network_head_height: u64,
    /// Failed heights and how many times each failed.
    #[serde(default)]
    pub failed: HashMap<String, u64>,
    #[serde(default)]
    pub workers: Vec<WorkerStats>,
    pub concurrency: u32,
    pub catch_up_done: bool,
    pub is_running: bool,
}
