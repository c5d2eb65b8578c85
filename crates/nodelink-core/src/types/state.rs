//! Account state types.

use super::u64_string;
use serde::{Deserialize, Serialize};

/// Coin balance of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(with = "u64_string")]
    pub amount: u64,
    pub denom: String,
}
