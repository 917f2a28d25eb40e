//! Region load cost functions
//!
//! One function per [`LoadMetric`]. Each region's load is derived from its
//! sample history once in `prepare`, summed per server, and the per-server
//! sums are scored with the same skew measure as region counts.

use super::skew::SkewStats;
use super::CostFunction;
use crate::cluster::{ClusterState, RegionMove};
use crate::types::RegionLoad;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Load dimension scored by a [`RegionLoadCostFunction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMetric {
    ReadRequests,
    WriteRequests,
    StoreFileSize,
    MemstoreSize,
}

impl LoadMetric {
    /// Cost function name for this metric
    pub fn name(self) -> &'static str {
        match self {
            LoadMetric::ReadRequests => "read_request",
            LoadMetric::WriteRequests => "write_request",
            LoadMetric::StoreFileSize => "store_file_size",
            LoadMetric::MemstoreSize => "memstore_size",
        }
    }

    /// Whether samples are cumulative counters scored as a rate
    pub fn is_rate(self) -> bool {
        matches!(self, LoadMetric::ReadRequests | LoadMetric::WriteRequests)
    }

    fn sample(self, load: &RegionLoad) -> f64 {
        match self {
            LoadMetric::ReadRequests => load.read_requests as f64,
            LoadMetric::WriteRequests => load.write_requests as f64,
            LoadMetric::StoreFileSize => load.store_file_size_mb,
            LoadMetric::MemstoreSize => load.memstore_size_mb,
        }
    }

    /// Single load value for a region from its sample history
    ///
    /// Rates average the growth between consecutive samples; a counter that
    /// went backwards was reset, so its current value counts as the growth.
    /// Sizes are plain averages.
    pub fn region_value(self, samples: &[RegionLoad]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }

        if self.is_rate() {
            if samples.len() < 2 {
                return 0.0;
            }
            let growth: f64 = samples
                .windows(2)
                .map(|w| {
                    let previous = self.sample(&w[0]);
                    let current = self.sample(&w[1]);
                    if current >= previous {
                        current - previous
                    } else {
                        current
                    }
                })
                .sum();
            (growth / (samples.len() - 1) as f64).max(0.0)
        } else {
            let total: f64 = samples.iter().map(|l| self.sample(l)).sum();
            total / samples.len() as f64
        }
    }
}

impl fmt::Display for LoadMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Skew of per-server summed region load for one metric
#[derive(Debug, Clone)]
pub struct RegionLoadCostFunction {
    metric: LoadMetric,
    weight: f64,
    region_values: Vec<f64>,
    server_loads: Vec<f64>,
    stats: SkewStats,
}

impl RegionLoadCostFunction {
    pub fn new(metric: LoadMetric, weight: f64) -> Self {
        Self {
            metric,
            weight,
            region_values: Vec::new(),
            server_loads: Vec::new(),
            stats: SkewStats::default(),
        }
    }

    pub fn metric(&self) -> LoadMetric {
        self.metric
    }
}

impl CostFunction for RegionLoadCostFunction {
    fn name(&self) -> &'static str {
        self.metric.name()
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn is_needed(&self, cluster: &ClusterState) -> bool {
        cluster.has_region_loads() && cluster.num_servers() > 1
    }

    fn prepare(&mut self, cluster: &ClusterState) {
        self.region_values = (0..cluster.num_regions())
            .map(|r| self.metric.region_value(cluster.region_loads(r)))
            .collect();

        self.server_loads = vec![0.0; cluster.num_servers()];
        for (region, value) in self.region_values.iter().enumerate() {
            self.server_loads[cluster.server_of_region(region)] += value;
        }

        self.stats = SkewStats::new(self.server_loads.iter().copied(), false);
    }

    fn cost(&self) -> f64 {
        self.stats.cost()
    }

    fn region_moved(&mut self, _cluster: &ClusterState, mv: &RegionMove) {
        if mv.from == mv.to {
            return;
        }
        let value = self.region_values[mv.region];
        if value == 0.0 {
            return;
        }

        let from = self.server_loads[mv.from];
        self.server_loads[mv.from] = from - value;
        self.stats.update(from, from - value);

        let to = self.server_loads[mv.to];
        self.server_loads[mv.to] = to + value;
        self.stats.update(to, to + value);
    }
}
