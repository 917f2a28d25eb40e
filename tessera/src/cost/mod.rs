//! Cost functions scoring a cluster assignment
//!
//! Every cost function produces a normalized value in [0, 1] where 0 means
//! perfectly balanced along its dimension. The lifecycle is:
//!
//! 1. [`CostFunction::prepare`] does a full scan of a fresh snapshot
//! 2. [`CostFunction::cost`] reads the current value without recomputing
//! 3. [`CostFunction::region_moved`] folds a single applied move into the
//!    function's accumulators; the result must match a fresh `prepare`
//!
//! [`CostFunctions`] holds the weighted set used by the balancer.

mod load;
mod locality;
mod moves;
mod replica;
mod skew;

pub use load::{LoadMetric, RegionLoadCostFunction};
pub use locality::LocalityCostFunction;
pub use moves::MoveCostFunction;
pub(crate) use replica::Domain;
pub use replica::{RegionReplicaHostCostFunction, RegionReplicaRackCostFunction};
pub use skew::{RegionCountSkewCostFunction, TableSkewCostFunction};

use crate::cluster::{ClusterState, RegionMove};
use crate::config::BalancerConfig;
use serde::{Deserialize, Serialize};

/// Costs below this are treated as zero
pub const COST_EPSILON: f64 = 0.0001;

/// A pluggable scorer for one placement dimension
pub trait CostFunction: Send {
    /// Stable name used in logs, metrics and breakdowns
    fn name(&self) -> &'static str;

    /// Multiplier applied to this function's cost
    fn weight(&self) -> f64;

    /// Whether the function has any signal on this cluster
    fn is_needed(&self, cluster: &ClusterState) -> bool {
        let _ = cluster;
        true
    }

    /// Seed internal accumulators from a full scan
    fn prepare(&mut self, cluster: &ClusterState);

    /// Current normalized cost in [0, 1]
    fn cost(&self) -> f64;

    /// Fold in a move that has just been applied to `cluster`
    fn region_moved(&mut self, cluster: &ClusterState, mv: &RegionMove);
}

/// Scale `value` from [min, max] into [0, 1], clamping out-of-range input
pub fn scale(min: f64, max: f64, value: f64) -> f64 {
    if max <= min || value <= min || (max - min).abs() <= COST_EPSILON {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// One row of a cost breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostComponent {
    pub name: String,
    pub weight: f64,
    pub cost: f64,
    /// False when the weight is zero or the function has no signal
    pub active: bool,
}

/// Ordered, weighted set of cost functions
pub struct CostFunctions {
    functions: Vec<Box<dyn CostFunction>>,
    active: Vec<bool>,
    sum_weights: f64,
}

impl CostFunctions {
    /// Wrap an explicit list of functions
    pub fn new(functions: Vec<Box<dyn CostFunction>>) -> Self {
        let active = vec![false; functions.len()];
        Self {
            functions,
            active,
            sum_weights: 0.0,
        }
    }

    /// The standard function family with weights from configuration
    pub fn from_config(config: &BalancerConfig) -> Self {
        let w = &config.weights;
        Self::new(vec![
            Box::new(RegionCountSkewCostFunction::new(w.region_count_skew)),
            Box::new(MoveCostFunction::new(w.move_cost, config.max_move_percent)),
            Box::new(TableSkewCostFunction::new(w.table_skew)),
            Box::new(LocalityCostFunction::new(w.locality)),
            Box::new(RegionReplicaHostCostFunction::new(w.replica_host)),
            Box::new(RegionReplicaRackCostFunction::new(w.replica_rack)),
            Box::new(RegionLoadCostFunction::new(
                LoadMetric::ReadRequests,
                w.read_requests,
            )),
            Box::new(RegionLoadCostFunction::new(
                LoadMetric::WriteRequests,
                w.write_requests,
            )),
            Box::new(RegionLoadCostFunction::new(
                LoadMetric::MemstoreSize,
                w.memstore_size,
            )),
            Box::new(RegionLoadCostFunction::new(
                LoadMetric::StoreFileSize,
                w.store_file_size,
            )),
        ])
    }

    /// Prepare every function that has a positive weight and is needed
    pub fn prepare(&mut self, cluster: &ClusterState) {
        self.sum_weights = 0.0;
        for (function, active) in self.functions.iter_mut().zip(self.active.iter_mut()) {
            *active = function.weight() > 0.0 && function.is_needed(cluster);
            if *active {
                function.prepare(cluster);
                self.sum_weights += function.weight();
            }
        }
    }

    /// Notify active functions of an applied move
    pub fn region_moved(&mut self, cluster: &ClusterState, mv: &RegionMove) {
        for (function, active) in self.functions.iter_mut().zip(&self.active) {
            if *active {
                function.region_moved(cluster, mv);
            }
        }
    }

    /// Weighted sum of active costs
    pub fn total(&self) -> f64 {
        self.functions
            .iter()
            .zip(&self.active)
            .filter(|(_, active)| **active)
            .map(|(f, _)| f.weight() * f.cost())
            .sum()
    }

    /// Sum of the weights of active functions
    pub fn sum_weights(&self) -> f64 {
        self.sum_weights
    }

    /// Weighted total divided by the active weights, in [0, 1]
    pub fn normalized(&self) -> f64 {
        if self.sum_weights <= 0.0 {
            0.0
        } else {
            self.total() / self.sum_weights
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&dyn CostFunction> {
        self.functions
            .iter()
            .find(|f| f.name() == name)
            .map(|f| &**f)
    }

    /// Whether the named function is active after `prepare`
    pub fn is_active(&self, name: &str) -> bool {
        self.functions
            .iter()
            .zip(&self.active)
            .any(|(f, active)| *active && f.name() == name)
    }

    /// Per-function costs in configuration order
    pub fn breakdown(&self) -> Vec<CostComponent> {
        self.functions
            .iter()
            .zip(&self.active)
            .map(|(f, active)| CostComponent {
                name: f.name().to_string(),
                weight: f.weight(),
                cost: if *active { f.cost() } else { 0.0 },
                active: *active,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
