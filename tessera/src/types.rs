//! Identity types shared by the cluster model and the balancer
//!
//! Servers and regions are opaque, comparable keys. The balancer never looks
//! inside them except to derive a region's replica group (its replica-0
//! identity) and a server's host name.

use crate::error::BalancerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Replica id of the primary copy of a region
pub const PRIMARY_REPLICA_ID: u32 = 0;

/// Identity of a region server: host, port and start code
///
/// Serialized as the string `host,port,start_code` so it can be used as a
/// JSON map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerName {
    /// Host name the server runs on
    pub host: String,

    /// RPC port
    pub port: u16,

    /// Start code distinguishing restarts of the same host:port
    pub start_code: u64,
}

impl ServerName {
    /// Create a new server name
    pub fn new(host: &str, port: u16, start_code: u64) -> Self {
        Self {
            host: host.to_string(),
            port,
            start_code,
        }
    }

    /// Host and port without the start code
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.host, self.port, self.start_code)
    }
}

impl FromStr for ServerName {
    type Err = BalancerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let (Some(host), Some(port), Some(start_code), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(BalancerError::Serialization(format!(
                "invalid server name '{}', expected host,port,start_code",
                s
            )));
        };

        if host.is_empty() {
            return Err(BalancerError::Serialization(format!(
                "invalid server name '{}': empty host",
                s
            )));
        }

        let port = port
            .trim()
            .parse()
            .map_err(|e| BalancerError::Serialization(format!("invalid port in '{}': {}", s, e)))?;
        let start_code = start_code.trim().parse().map_err(|e| {
            BalancerError::Serialization(format!("invalid start code in '{}': {}", s, e))
        })?;

        Ok(Self {
            host: host.trim().to_string(),
            port,
            start_code,
        })
    }
}

impl TryFrom<String> for ServerName {
    type Error = BalancerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServerName> for String {
    fn from(server: ServerName) -> Self {
        server.to_string()
    }
}

/// A contiguous key range of a table, the unit of assignment
///
/// Regions that differ only in `replica_id` are copies of the same logical
/// region and form a replica group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionInfo {
    /// Table this region belongs to
    pub table: String,

    /// Inclusive start key (empty = table start)
    #[serde(default)]
    pub start_key: String,

    /// Exclusive end key (empty = table end)
    #[serde(default)]
    pub end_key: String,

    /// Region id (creation timestamp in most deployments)
    pub region_id: u64,

    /// Replica index, 0 for the primary
    #[serde(default)]
    pub replica_id: u32,
}

impl RegionInfo {
    /// Create a primary region
    pub fn new(table: &str, start_key: &str, end_key: &str, region_id: u64) -> Self {
        Self {
            table: table.to_string(),
            start_key: start_key.to_string(),
            end_key: end_key.to_string(),
            region_id,
            replica_id: PRIMARY_REPLICA_ID,
        }
    }

    /// The sibling of this region with the given replica id
    pub fn replica(&self, replica_id: u32) -> Self {
        Self {
            replica_id,
            ..self.clone()
        }
    }

    /// The primary identity shared by every member of this region's replica group
    pub fn base(&self) -> Self {
        self.replica(PRIMARY_REPLICA_ID)
    }

    /// Whether this is the primary replica
    pub fn is_primary(&self) -> bool {
        self.replica_id == PRIMARY_REPLICA_ID
    }

    /// Whether two regions belong to the same replica group
    pub fn is_replica_of(&self, other: &RegionInfo) -> bool {
        self.table == other.table
            && self.start_key == other.start_key
            && self.end_key == other.end_key
            && self.region_id == other.region_id
    }
}

impl fmt::Display for RegionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{}.{}",
            self.table, self.start_key, self.region_id, self.replica_id
        )
    }
}

/// One load sample reported for a region
///
/// Request counters are cumulative; sizes are point-in-time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionLoad {
    #[serde(default)]
    pub read_requests: u64,

    #[serde(default)]
    pub write_requests: u64,

    #[serde(default)]
    pub store_file_size_mb: f64,

    #[serde(default)]
    pub memstore_size_mb: f64,
}

/// A single region relocation proposed by the balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionPlan {
    /// Region being moved
    pub region: RegionInfo,

    /// Server currently hosting the region
    pub source: ServerName,

    /// Server that should host the region
    pub destination: ServerName,
}
