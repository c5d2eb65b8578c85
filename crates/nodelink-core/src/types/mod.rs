//! Typed values returned by the node API facades.
//!
//! Field names follow the node's JSON; integers the node encodes as decimal
//! strings are accepted in either form.

pub mod blob;
pub mod das;
pub mod header;
pub mod p2p;
pub mod share;
pub mod state;

pub use blob::{
    Blob, Commitment, CommitmentProof, Namespace, Proof, RowProof, RowProofEntry,
    SubmitBlobResult, SubscriptionBlobResult, TxConfig,
};
pub use das::{SamplingStats, WorkerStats};
pub use header::{
    BlockId, Commit, CommitSignature, ConsensusVersion, Dah, ExtendedHeader, Header, Parts,
    PubKey, SyncState, Validator, ValidatorSet,
};
pub use p2p::{AddrInfo, BandwidthStats, Connectedness, PeerId, Reachability, ResourceManagerStat};
pub use share::{
    ExtendedDataSquare, GetRangeResult, NamespaceData, Sample, SampleCoords, ShareProof,
};
pub use state::Balance;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Byte string carried on the wire as standard base64 text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Base64(pub Vec<u8>);

impl Base64 {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Decode base64 text.
    pub fn decode(text: &str) -> crate::Result<Self> {
        STANDARD
            .decode(text)
            .map(Self)
            .map_err(crate::RpcError::decode)
    }
}

impl From<Vec<u8>> for Base64 {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Base64 {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Base64 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Base64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", STANDARD.encode(&self.0))
    }
}

impl Serialize for Base64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Accept an unsigned integer encoded either as a JSON number or a string.
pub(crate) mod u64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(text) => text.parse().map_err(de::Error::custom),
        }
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base64_serializes_as_text() {
        let value = Base64::from(vec![0u8, 1, 2, 3]);
        assert_eq!(serde_json::to_value(&value).unwrap(), json!("AAECAw=="));
        assert_eq!(value.to_string(), "AAECAw==");
    }

    #[test]
    fn test_base64_rejects_invalid_text() {
        assert!(serde_json::from_value::<Base64>(json!("not base64!")).is_err());
        assert!(Base64::decode("%%").is_err());
    }

    #[test]
    fn test_u64_string_accepts_both_forms() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(with = "u64_string")]
            height: u64,
        }

        let from_text: Wrapper = serde_json::from_value(json!({"height": "12"})).unwrap();
        let from_number: Wrapper = serde_json::from_value(json!({"height": 12})).unwrap();
        assert_eq!(from_text.height, 12);
        assert_eq!(from_number.height, 12);
    }
}
