//! Cluster state model
//!
//! A [`ClusterState`] is a normalized, integer-indexed snapshot of a
//! server -> regions assignment. Servers, hosts, racks, tables, regions and
//! replica groups are all addressed by dense `usize` indices so cost functions
//! can keep flat accumulators keyed by those indices.
//!
//! ```text
//!   rack ──< server ──< region >── table
//!    │         │          │
//!    └── host ─┘          └──> replica group (same region, different replica id)
//! ```
//!
//! The snapshot is mutated in place by [`ClusterState::move_region`], which
//! keeps every derived index consistent in O(1) per move.

mod state;

pub use state::{ClusterState, ClusterStateBuilder};

use crate::types::{RegionInfo, RegionLoad, ServerName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Server -> hosted regions, the input and output shape of a balancing run
pub type ServerRegions = BTreeMap<ServerName, Vec<RegionInfo>>;

/// Historical load samples per region, oldest first
pub type RegionLoadHints = HashMap<RegionInfo, Vec<RegionLoad>>;

/// Fraction of each region's data that is local to a given server, in [0, 1]
pub type LocalityHints = HashMap<RegionInfo, HashMap<ServerName, f64>>;

/// Relocation of one region between two servers (all indices)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMove {
    pub region: usize,
    pub from: usize,
    pub to: usize,
}

impl RegionMove {
    pub fn new(region: usize, from: usize, to: usize) -> Self {
        Self { region, from, to }
    }

    /// The move that puts the region back
    pub fn inverse(&self) -> Self {
        Self {
            region: self.region,
            from: self.to,
            to: self.from,
        }
    }
}

/// A candidate change to the assignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Nothing to do
    #[default]
    Null,
    /// Move one region to another server
    Move { region: usize, from: usize, to: usize },
    /// Exchange two regions hosted on different servers
    Swap {
        from_server: usize,
        from_region: usize,
        to_server: usize,
        to_region: usize,
    },
}

impl Action {
    /// Whether this action changes nothing
    pub fn is_null(&self) -> bool {
        matches!(self, Action::Null)
    }

    /// Elementary region moves, in application order
    pub fn moves(&self) -> Vec<RegionMove> {
        match *self {
            Action::Null => Vec::new(),
            Action::Move { region, from, to } => vec![RegionMove::new(region, from, to)],
            Action::Swap {
                from_server,
                from_region,
                to_server,
                to_region,
            } => vec![
                RegionMove::new(from_region, from_server, to_server),
                RegionMove::new(to_region, to_server, from_server),
            ],
        }
    }

    /// The action that reverts this one once it has been applied
    pub fn undo(&self) -> Action {
        match *self {
            Action::Null => Action::Null,
            Action::Move { region, from, to } => Action::Move {
                region,
                from: to,
                to: from,
            },
            Action::Swap {
                from_server,
                from_region,
                to_server,
                to_region,
            } => Action::Swap {
                from_server: to_server,
                from_region,
                to_server: from_server,
                to_region,
            },
        }
    }
}
