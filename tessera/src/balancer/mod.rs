//! Balancer decision engine
//!
//! [`StochasticBalancer`] answers two questions about a [`ClusterState`]:
//! whether it is worth balancing at all ([`StochasticBalancer::needs_balance`])
//! and, if so, which assignment the search finds
//! ([`StochasticBalancer::balance`]).
//!
//! [`ClusterState`]: crate::cluster::ClusterState

mod engine;

pub use engine::StochasticBalancer;

use crate::cluster::ServerRegions;
use crate::cost::CostComponent;
use crate::types::RegionPlan;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why the fast pre-check did or did not ask for a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum BalanceDecision {
    /// Fewer servers than `min_servers`
    TooFewServers { servers: usize, min_servers: usize },
    /// No regions to place
    NoRegions,
    /// Replicas share a domain and spreading them is possible
    Colocated { function: String, cost: f64 },
    /// A server is empty while another hosts several regions
    IdleServer,
    /// A server's region count is outside the slop band around the average
    OutsideSlop { min: usize, max: usize, floor: usize, ceiling: usize },
    /// The normalized cost reaches the configured threshold
    CostAboveThreshold { cost: f64, threshold: f64 },
    /// Nothing to gain
    Balanced { cost: f64, threshold: f64 },
}

impl BalanceDecision {
    /// Whether this decision calls for a search
    pub fn needs_balance(&self) -> bool {
        matches!(
            self,
            BalanceDecision::Colocated { .. }
                | BalanceDecision::IdleServer
                | BalanceDecision::OutsideSlop { .. }
                | BalanceDecision::CostAboveThreshold { .. }
        )
    }

    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            BalanceDecision::TooFewServers { .. } => "too_few_servers",
            BalanceDecision::NoRegions => "no_regions",
            BalanceDecision::Colocated { .. } => "colocated",
            BalanceDecision::IdleServer => "idle_server",
            BalanceDecision::OutsideSlop { .. } => "outside_slop",
            BalanceDecision::CostAboveThreshold { .. } => "cost_above_threshold",
            BalanceDecision::Balanced { .. } => "balanced",
        }
    }
}

/// How a search run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The pre-check found nothing worth doing; no search ran
    NotNeeded,
    /// Cost reached zero
    CostFloor,
    /// Iteration budget used up
    StepBudget,
    /// Time budget used up
    TimeBudget,
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::NotNeeded => "not_needed",
            StopReason::CostFloor => "cost_floor",
            StopReason::StepBudget => "step_budget",
            StopReason::TimeBudget => "time_budget",
        }
    }
}

/// Weighted cost of one assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    /// Sum of `weight * cost` over active functions
    pub total: f64,

    /// `total` divided by the sum of active weights
    pub normalized: f64,

    /// Per-function costs
    pub components: Vec<CostComponent>,
}

/// Outcome of a balancing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResult {
    /// Unique ID for this run
    pub plan_id: String,

    /// Proposed assignment; equal to the input when nothing moved
    pub assignment: ServerRegions,

    /// One plan per region whose server changed
    pub plans: Vec<RegionPlan>,

    /// Weighted cost of the input assignment
    pub initial_cost: f64,

    /// Weighted cost of the proposed assignment
    pub final_cost: f64,

    /// Search iterations performed
    pub steps: u64,

    /// Wall-clock time spent
    pub elapsed: Duration,

    pub stop_reason: StopReason,

    /// Per-function costs of the proposed assignment
    pub costs: Vec<CostComponent>,
}

impl BalanceResult {
    /// Whether the run proposes any move
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Number of regions to move
    pub fn move_count(&self) -> usize {
        self.plans.len()
    }
}
