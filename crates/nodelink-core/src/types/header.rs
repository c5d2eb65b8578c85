//! Extended header and syncer state types.

use super::{u64_string, Base64};
use crate::{Result, RpcError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusVersion {
    #[serde(with = "u64_string")]
    pub block: u64,
    #[serde(with = "u64_string", default)]
    pub app: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parts {
    pub total: u32,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockId {
    pub hash: String,
    pub parts: Parts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: ConsensusVersion,
    pub chain_id: String,
    #[serde(with = "u64_string")]
    pub height: u64,
    pub time: DateTime<Utc>,
    pub last_block_id: BlockId,
    pub last_commit_hash: String,
    pub data_hash: String,
    pub validators_hash: String,
    pub next_validators_hash: String,
    pub consensus_hash: String,
    pub app_hash: String,
    pub last_results_hash: String,
    pub evidence_hash: String,
    pub proposer_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: Base64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub address: String,
    pub pub_key: PubKey,
    pub voting_power: String,
    pub proposer_priority: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    pub validators: Vec<Validator>,
    pub proposer: Validator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSignature {
    pub block_id_flag: u8,
    pub validator_address: String,
    pub timestamp: DateTime<Utc>,
    pub signature: Option<Base64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    #[serde(with = "u64_string")]
    pub height: u64,
    pub round: u32,
    pub block_id: BlockId,
    pub signatures: Vec<CommitSignature>,
}

/// Data availability header: row and column roots of the extended square.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dah {
    pub row_roots: Vec<Base64>,
    pub column_roots: Vec<Base64>,
}

/// Header of a block extended with its validator set, commit and DAH.
///
/// Keeps the JSON it was decoded from so it can be passed back to the node
/// verbatim (e.g. as the lower bound of `header.GetRangeByHeight`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedHeader {
    pub header: Header,
    pub validator_set: ValidatorSet,
    pub commit: Commit,
    pub dah: Dah,
    raw: Value,
}

#[derive(Deserialize)]
struct ExtendedHeaderParts {
    header: Header,
    validator_set: ValidatorSet,
    commit: Commit,
    dah: Dah,
}

impl ExtendedHeader {
    pub fn from_value(raw: Value) -> Result<Self> {
        let parts: ExtendedHeaderParts =
            serde_json::from_value(raw.clone()).map_err(RpcError::decode)?;
        Ok(Self {
            header: parts.header,
            validator_set: parts.validator_set,
            commit: parts.commit,
            dah: parts.dah,
            raw,
        })
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Hash of this block as referenced by the next header.
    pub fn hash(&self) -> &str {
        &self.commit.block_id.hash
    }

    /// The JSON object exactly as the node returned it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl Serialize for ExtendedHeader {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExtendedHeader {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(raw).map_err(serde::de::Error::custom)
    }
}

/// Progress of the header syncer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub id: u64,
    pub height: u64,
    pub from_height: u64,
    pub to_height: u64,
    pub from_hash: String,
    pub to_hash: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    pub fn extended_header_json(height: u64) -> Value {
        let validator = json!({
            "address": "ADDR",
            "pub_key": {"type": "tendermint/PubKeyEd25519", "value": "AAECAw=="},
            "voting_power": "100",
            "proposer_priority": "0"
        });
        json!({
            "header": {
                "version": {"block": "11", "app": "1"},
                "chain_id": "private",
                "height": height.to_string(),
                "time": "2024-05-01T12:00:00Z",
                "last_block_id": {"hash": "PREV", "parts": {"total": 1, "hash": "P"}},
                "last_commit_hash": "LC",
                "data_hash": "DH",
                "validators_hash": "VH",
                "next_validators_hash": "NVH",
                "consensus_hash": "CH",
                "app_hash": "AH",
                "last_results_hash": "LRH",
                "evidence_hash": "EH",
                "proposer_address": "ADDR"
            },
            "validator_set": {"validators": [validator.clone()], "proposer": validator},
            "commit": {
                "height": height,
                "round": 0,
                "block_id": {"hash": format!("HASH{}", height), "parts": {"total": 1, "hash": "P"}},
                "signatures": [{
                    "block_id_flag": 2,
                    "validator_address": "ADDR",
                    "timestamp": "2024-05-01T12:00:01Z",
                    "signature": "AAECAw=="
                }]
            },
            "dah": {"row_roots": ["AAECAw=="], "column_roots": ["AAECAw=="]}
        })
    }
}
