//! Shares, samples and the extended data square.

use super::blob::{null_as_empty, Proof, RowProof};
use super::Base64;
use serde::{Deserialize, Serialize};

/// One share of the extended data square.
pub type Sample = Base64;

/// Row and column of a share in the extended data square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCoords {
    pub row: u64,
    pub col: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedDataSquare {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data_square: Vec<Sample>,
    pub codec: String,
}

/// Shares of one namespace within a row, with their inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub shares: Vec<Sample>,
    pub proof: Proof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareProof {
    pub namespace_id: Base64,
    pub namespace_version: u8,
    pub row_proof: RowProof,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<Sample>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub share_proofs: Vec<Proof>,
}

/// Result of `share.GetRange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRangeResult {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub shares: Vec<Sample>,
    pub proof: ShareProof,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_range_result_field_names() {
        let value = json!({
            "Shares": ["AAE="],
            "Proof": {
                "namespace_id": "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA==",
                "namespace_version": 0,
                "row_proof": {"start_row": 1, "end_row": 1, "row_roots": null, "proofs": null},
                "data": null,
                "share_proofs": [{"end": 2, "nodes": ["AQ=="]}]
            }
        });

        let result: GetRangeResult = serde_json::from_value(value).unwrap();
        assert_eq!(result.shares, vec![Base64(vec![0, 1])]);
        assert_eq!(result.proof.share_proofs[0].end, 2);
        assert!(result.proof.data.is_empty());
    }
}
