//! Rack topology lookup
//!
//! The balancer only needs a pure `server -> rack` function. It is resolved
//! once per server when a [`ClusterState`](crate::cluster::ClusterState) is
//! built and never consulted again during a run.

use crate::error::Result;
use crate::types::ServerName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Rack assigned to servers when no lookup is configured
pub const UNKNOWN_RACK: &str = "Unknown Rack";

/// Maps a server to the rack it lives in
pub trait RackLookup {
    /// Rack name for the given server
    fn rack(&self, server: &ServerName) -> String;
}

impl<F> RackLookup for F
where
    F: Fn(&ServerName) -> String,
{
    fn rack(&self, server: &ServerName) -> String {
        self(server)
    }
}

/// Rack lookup backed by a static host -> rack table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticRackLookup {
    /// Rack for hosts missing from `hosts`
    #[serde(default = "default_rack")]
    pub default_rack: String,

    /// Host name to rack name
    #[serde(default)]
    pub hosts: HashMap<String, String>,
}

fn default_rack() -> String {
    UNKNOWN_RACK.to_string()
}

impl Default for StaticRackLookup {
    fn default() -> Self {
        Self::new(UNKNOWN_RACK)
    }
}

impl StaticRackLookup {
    /// Create an empty lookup that places every host on `default_rack`
    pub fn new(default_rack: &str) -> Self {
        Self {
            default_rack: default_rack.to_string(),
            hosts: HashMap::new(),
        }
    }

    /// Add a host -> rack mapping
    pub fn with_host(mut self, host: &str, rack: &str) -> Self {
        self.hosts.insert(host.to_string(), rack.to_string());
        self
    }

    /// Parse from TOML
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

impl RackLookup for StaticRackLookup {
    fn rack(&self, server: &ServerName) -> String {
        self.hosts
            .get(&server.host)
            .cloned()
            .unwrap_or_else(|| self.default_rack.clone())
    }
}
