//! `blob` namespace: submit, fetch and prove blobs.

use super::optional;
use crate::rpc::{RpcEngine, Subscription};
use crate::types::{
    Blob, Commitment, CommitmentProof, Namespace, Proof, SubmitBlobResult,
    SubscriptionBlobResult, TxConfig,
};
use crate::{Result, RpcError};
use serde_json::{json, Value};

/// Stream of inclusions produced by [`BlobClient::subscribe`].
pub type BlobStream = Subscription<SubscriptionBlobResult>;

#[derive(Debug, Clone)]
pub struct BlobClient {
    rpc: RpcEngine,
}

impl BlobClient {
    pub(crate) fn new(rpc: RpcEngine) -> Self {
        Self { rpc }
    }

    /// Blob with `commitment` under `namespace` at `height`, if present.
    pub async fn get(
        &self,
        height: u64,
        namespace: &Namespace,
        commitment: &Commitment,
    ) -> Result<Option<Blob>> {
        optional(
            self.rpc
                .call_typed("blob.Get", blob_ref(height, namespace, commitment)?)
                .await,
        )
    }

    /// Every blob under any of `namespaces` at `height`.
    pub async fn get_all(&self, height: u64, namespaces: &[Namespace]) -> Result<Vec<Blob>> {
        let blobs: Option<Vec<Blob>> = self
            .rpc
            .call_typed(
                "blob.GetAll",
                vec![json!(height), serde_json::to_value(namespaces)?],
            )
            .await?;
        Ok(blobs.unwrap_or_default())
    }

    /// Submit blobs atomically with the node's default wallet and wait for
    /// the height they were included at.
    pub async fn submit(&self, blobs: &[Blob], options: &TxConfig) -> Result<SubmitBlobResult> {
        if blobs.is_empty() {
            return Err(RpcError::Validation {
                field: "blobs".to_string(),
                message: "at least one blob is required".to_string(),
            });
        }
        let height: u64 = self
            .rpc
            .call_typed(
                "blob.Submit",
                vec![serde_json::to_value(blobs)?, serde_json::to_value(options)?],
            )
            .await?;

        Ok(SubmitBlobResult {
            height,
            commitments: blobs.iter().map(|blob| blob.commitment.clone()).collect(),
        })
    }

    /// Proof that a share commitment is part of the block at `height`.
    pub async fn get_commitment_proof(
        &self,
        height: u64,
        namespace: &Namespace,
        commitment: &Commitment,
    ) -> Result<Option<CommitmentProof>> {
        optional(
            self.rpc
                .call_typed("blob.GetCommitmentProof", blob_ref(height, namespace, commitment)?)
                .await,
        )
    }

    /// Inclusion proofs for the blob with `commitment`.
    pub async fn get_proof(
        &self,
        height: u64,
        namespace: &Namespace,
        commitment: &Commitment,
    ) -> Result<Option<Vec<Proof>>> {
        let proofs: Option<Option<Vec<Proof>>> = optional(
            self.rpc
                .call_typed("blob.GetProof", blob_ref(height, namespace, commitment)?)
                .await,
        )?;
        Ok(proofs.map(Option::unwrap_or_default))
    }

    /// Check a commitment against its proofs at `height`.
    pub async fn included(
        &self,
        height: u64,
        namespace: &Namespace,
        proofs: &[Proof],
        commitment: &Commitment,
    ) -> Result<bool> {
        self.rpc
            .call_typed(
                "blob.Included",
                vec![
                    json!(height),
                    serde_json::to_value(namespace)?,
                    serde_json::to_value(proofs)?,
                    serde_json::to_value(commitment)?,
                ],
            )
            .await
    }

    /// Blobs published under `namespace`, one item per included height.
    pub async fn subscribe(&self, namespace: &Namespace) -> Result<BlobStream> {
        self.rpc
            .subscribe_typed("blob.Subscribe", vec![serde_json::to_value(namespace)?])
            .await
    }
}

/// Positional params shared by the methods that address one blob.
fn blob_ref(height: u64, namespace: &Namespace, commitment: &Commitment) -> Result<Vec<Value>> {
    Ok(vec![
        json!(height),
        serde_json::to_value(namespace)?,
        serde_json::to_value(commitment)?,
    ])
}
