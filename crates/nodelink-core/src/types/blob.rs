//! Blob, namespace and inclusion-proof types.

use super::Base64;
use crate::{Result, RpcError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Size of a serialized namespace: one version byte and a 28 byte id.
pub const NAMESPACE_SIZE: usize = 29;
/// Longest user-chosen id a version 0 namespace can carry.
pub const NAMESPACE_V0_ID_SIZE: usize = 10;

/// Namespace blobs are published under.
///
/// Always [`NAMESPACE_SIZE`] bytes. Short ids are expanded into version 0
/// namespaces by [`Namespace::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace([u8; NAMESPACE_SIZE]);

impl Namespace {
    /// Accept either a full namespace or a version 0 id of at most
    /// [`NAMESPACE_V0_ID_SIZE`] bytes.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.len() == NAMESPACE_SIZE {
            let mut raw = [0u8; NAMESPACE_SIZE];
            raw.copy_from_slice(bytes);
            return Ok(Self(raw));
        }
        Self::new_v0(bytes)
    }

    /// Version 0 namespace: zero version byte, zero padding, then the id
    /// right-aligned in the last ten bytes.
    pub fn new_v0(id: &[u8]) -> Result<Self> {
        if id.is_empty() || id.len() > NAMESPACE_V0_ID_SIZE {
            return Err(RpcError::Validation {
                field: "namespace".to_string(),
                message: format!(
                    "version 0 id must be 1 to {} bytes, got {}",
                    NAMESPACE_V0_ID_SIZE,
                    id.len()
                ),
            });
        }
        let mut raw = [0u8; NAMESPACE_SIZE];
        raw[NAMESPACE_SIZE - id.len()..].copy_from_slice(id);
        Ok(Self(raw))
    }

    pub fn version(&self) -> u8 {
        self.0[0]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Namespace {
    type Error = RpcError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::new(bytes)
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Base64::from(&self.0[..]))
    }
}

impl Serialize for Namespace {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Base64::from(&self.0[..]).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Namespace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let bytes = Base64::deserialize(deserializer)?;
        Self::new(bytes.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Share commitment identifying a blob within a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(pub Base64);

impl From<Vec<u8>> for Commitment {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Base64(bytes))
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A blob as stored by the node.
///
/// The commitment is computed by whoever builds the blob; the node rejects a
/// submission whose commitment does not match its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub namespace: Namespace,
    pub data: Base64,
    #[serde(default)]
    pub share_version: u32,
    pub commitment: Commitment,
    /// Index of the blob's first share in the square, once included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
}

impl Blob {
    pub fn new(namespace: Namespace, data: impl Into<Base64>, commitment: Commitment) -> Self {
        Self {
            namespace,
            data: data.into(),
            share_version: 0,
            commitment,
            index: None,
        }
    }
}

/// Transaction options for `blob.Submit`. Unset fields use node defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_gas_price_set: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_granter_address: Option<String>,
}

/// Height a submission landed at and the commitments of its blobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBlobResult {
    pub height: u64,
    pub commitments: Vec<Commitment>,
}

/// One `blob.Subscribe` item: every blob of the namespace included at a height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionBlobResult {
    pub height: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub blobs: Vec<Blob>,
}

/// Namespaced Merkle tree range proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    #[serde(default)]
    pub start: Option<u64>,
    pub end: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub nodes: Vec<Base64>,
    #[serde(default)]
    pub is_max_namespace_ignored: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowProofEntry {
    pub index: u64,
    pub total: u64,
    pub leaf_hash: Base64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub aunts: Vec<Base64>,
}

/// Proof that a range of rows belongs to the data root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowProof {
    pub start_row: u64,
    pub end_row: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub row_roots: Vec<Base64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub proofs: Vec<RowProofEntry>,
}

/// Proof that a share commitment is included in the data root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentProof {
    pub namespace_id: Base64,
    pub namespace_version: u8,
    pub row_proof: RowProof,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subtree_root_proofs: Vec<Proof>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subtree_roots: Vec<Base64>,
}

/// The node encodes empty slices as `null`.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
