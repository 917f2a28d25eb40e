//! Tessera - Cost-driven region placement for replicated storage clusters
//!
//! Given a server -> regions assignment, Tessera scores it with a weighted set
//! of cost functions and searches for a cheaper assignment with a stochastic
//! local search.
//!
//! # Architecture
//!
//! - **Topology**: pluggable `server -> rack` lookup
//! - **Cluster**: integer-indexed snapshot with O(1) region moves
//! - **Cost**: pluggable cost functions with incremental updates
//! - **Candidate**: stateless move generators sampled by weight
//! - **Balancer**: needs-balance pre-check and the annealing search loop
//!
//! # Example
//!
//! ```ignore
//! let state = ClusterState::builder(&assignment).racks(&lookup).build()?;
//! let balancer = StochasticBalancer::new(BalancerConfig::default())?;
//! if balancer.needs_balance(None, &state) {
//!     let result = balancer.balance(&mut state)?;
//!     for plan in &result.plans {
//!         println!("{} -> {}", plan.region, plan.destination);
//!     }
//! }
//! ```

pub mod balancer;
pub mod candidate;
pub mod cluster;
pub mod config;
pub mod cost;
pub mod error;
pub mod metrics;
pub mod topology;
pub mod types;

pub use balancer::{BalanceDecision, BalanceResult, CostReport, StochasticBalancer, StopReason};
pub use candidate::{CandidateGenerator, GeneratorSet};
pub use cluster::{
    Action, ClusterState, ClusterStateBuilder, LocalityHints, RegionLoadHints, RegionMove,
    ServerRegions,
};
pub use config::{BalancerConfig, CostWeights, GeneratorWeights};
pub use cost::{CostComponent, CostFunction, CostFunctions, COST_EPSILON};
pub use error::{BalancerError, Result};
pub use topology::{RackLookup, StaticRackLookup, UNKNOWN_RACK};
pub use types::*;
