//! Loading cluster descriptions, balancer config and rack tables from disk

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tessera::{
    BalancerConfig, ClusterState, LocalityHints, RegionInfo, RegionLoad, RegionLoadHints,
    ServerName, ServerRegions, StaticRackLookup,
};

/// Point-in-time cluster view as stored in JSON
///
/// ```json
/// {
///   "servers": { "host1,16020,1": [{ "table": "t", "region_id": 1 }] },
///   "region_loads": [{ "region": { "table": "t", "region_id": 1 }, "samples": [] }],
///   "locality": [{ "region": { "table": "t", "region_id": 1 }, "servers": { "host1,16020,1": 0.9 } }]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClusterDescription {
    /// Server -> hosted regions
    pub servers: ServerRegions,

    /// Load history per region, oldest sample first
    #[serde(default)]
    pub region_loads: Vec<RegionLoadEntry>,

    /// Locality per region and server
    #[serde(default)]
    pub locality: Vec<LocalityEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegionLoadEntry {
    pub region: RegionInfo,
    #[serde(default)]
    pub samples: Vec<RegionLoad>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalityEntry {
    pub region: RegionInfo,
    #[serde(default)]
    pub servers: HashMap<ServerName, f64>,
}

impl ClusterDescription {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("Failed to parse cluster description")
    }

    pub fn load_hints(&self) -> RegionLoadHints {
        self.region_loads
            .iter()
            .map(|e| (e.region.clone(), e.samples.clone()))
            .collect()
    }

    pub fn locality_hints(&self) -> LocalityHints {
        self.locality
            .iter()
            .map(|e| (e.region.clone(), e.servers.clone()))
            .collect()
    }
}

/// Everything a command needs to build a snapshot
pub struct LoadedInputs {
    pub cluster: ClusterDescription,
    pub config: BalancerConfig,
    pub racks: Option<StaticRackLookup>,
    loads: RegionLoadHints,
    locality: LocalityHints,
}

impl LoadedInputs {
    pub fn new(
        cluster: ClusterDescription,
        config: BalancerConfig,
        racks: Option<StaticRackLookup>,
    ) -> Self {
        let loads = cluster.load_hints();
        let locality = cluster.locality_hints();
        Self {
            cluster,
            config,
            racks,
            loads,
            locality,
        }
    }

    /// Build a fresh snapshot of the described cluster
    pub fn snapshot(&self) -> Result<ClusterState> {
        let mut builder = ClusterState::builder(&self.cluster.servers);
        if !self.loads.is_empty() {
            builder = builder.region_loads(&self.loads);
        }
        if !self.locality.is_empty() {
            builder = builder.locality(&self.locality);
        }
        if let Some(racks) = &self.racks {
            builder = builder.racks(racks);
        }
        builder.build().context("Invalid cluster description")
    }
}

/// Read the cluster description plus optional config and rack table
pub fn load_inputs(
    cluster: &Path,
    config: Option<&Path>,
    racks: Option<&Path>,
) -> Result<LoadedInputs> {
    let contents = std::fs::read_to_string(cluster)
        .with_context(|| format!("Failed to read cluster description {:?}", cluster))?;
    let description = ClusterDescription::from_json_str(&contents)
        .with_context(|| format!("Invalid cluster description {:?}", cluster))?;

    let config = match config {
        Some(path) => BalancerConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => BalancerConfig::default(),
    };

    let racks = match racks {
        Some(path) => Some(
            StaticRackLookup::load(path)
                .with_context(|| format!("Failed to load rack table {:?}", path))?,
        ),
        None => None,
    };

    tracing::debug!(
        servers = description.servers.len(),
        racks = racks.is_some(),
        "Loaded cluster description"
    );

    Ok(LoadedInputs::new(description, config, racks))
}
