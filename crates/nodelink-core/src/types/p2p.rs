//! Peer-to-peer networking types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type PeerId = String;

/// Peer identity and its known multiaddresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrInfo {
    #[serde(rename = "ID")]
    pub id: PeerId,
    #[serde(rename = "Addrs", default)]
    pub addrs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BandwidthStats {
    pub total_in: i64,
    pub total_out: i64,
    pub rate_in: f64,
    pub rate_out: f64,
}

/// Resource manager scopes, kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceManagerStat {
    pub system: Value,
    pub transient: Value,
    pub services: Value,
    pub protocols: Value,
    pub peers: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Connectedness {
    NotConnected,
    Connected,
    CanConnect,
    CannotConnect,
    Limited,
}

impl TryFrom<u8> for Connectedness {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Connectedness::NotConnected),
            1 => Ok(Connectedness::Connected),
            2 => Ok(Connectedness::CanConnect),
            3 => Ok(Connectedness::CannotConnect),
            4 => Ok(Connectedness::Limited),
            other => Err(format!("unknown connectedness {}", other)),
        }
    }
}

impl From<Connectedness> for u8 {
    fn from(value: Connectedness) -> Self {
        match value {
            Connectedness::NotConnected => 0,
            Connectedness::Connected => 1,
            Connectedness::CanConnect => 2,
            Connectedness::CannotConnect => 3,
            Connectedness::Limited => 4,
        }
    }
}

/// NAT reachability of the local host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Reachability {
    Unknown,
    Public,
    Private,
}

impl TryFrom<u8> for Reachability {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Reachability::Unknown),
            1 => Ok(Reachability::Public),
            2 => Ok(Reachability::Private),
            other => Err(format!("unknown reachability {}", other)),
        }
    }
}

impl From<Reachability> for u8 {
    fn from(value: Reachability) -> Self {
        match value {
            Reachability::Unknown => 0,
            Reachability::Public => 1,
            Reachability::Private => 2,
        }
    }
}
