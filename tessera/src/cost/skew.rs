//! Distribution skew cost functions
//!
//! Skew is the standard deviation of a per-server quantity, scaled between
//! the most even distribution possible and everything on a single server.
//! The total of the quantity never changes under a move, so only the sum of
//! squares has to be maintained incrementally.

use super::{scale, CostFunction};
use crate::cluster::{ClusterState, RegionMove};

/// Running statistics for one per-server distribution
#[derive(Debug, Clone, Default)]
pub(crate) struct SkewStats {
    count: usize,
    total: f64,
    sum_sq: f64,
    min_deviation: f64,
    max_deviation: f64,
}

impl SkewStats {
    /// Seed from the current values
    ///
    /// `integral` values can only be spread in whole units, which raises the
    /// best achievable deviation above zero when they do not divide evenly.
    pub(crate) fn new<I>(values: I, integral: bool) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0usize;
        let mut total = 0.0;
        let mut sum_sq = 0.0;
        for v in values {
            count += 1;
            total += v;
            sum_sq += v * v;
        }
        if count == 0 {
            return Self::default();
        }

        let n = count as f64;
        let mean = total / n;
        let max_deviation = (n - 1.0) * mean * mean + (total - mean) * (total - mean);
        let min_deviation = if integral {
            let floor = mean.floor();
            let ceil = mean.ceil();
            let num_high = (total - floor * n).round();
            num_high * (ceil - mean) * (ceil - mean)
                + (n - num_high) * (floor - mean) * (floor - mean)
        } else {
            0.0
        };

        Self {
            count,
            total,
            sum_sq,
            min_deviation,
            max_deviation,
        }
    }

    /// Replace one value
    pub(crate) fn update(&mut self, old: f64, new: f64) {
        self.sum_sq += new * new - old * old;
    }

    fn deviation(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.total / self.count as f64;
        (self.sum_sq - self.count as f64 * mean * mean).max(0.0)
    }

    pub(crate) fn cost(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        scale(
            self.min_deviation.sqrt(),
            self.max_deviation.sqrt(),
            self.deviation().sqrt(),
        )
    }
}

/// Skew of region counts across servers
#[derive(Debug, Clone)]
pub struct RegionCountSkewCostFunction {
    weight: f64,
    stats: SkewStats,
}

impl RegionCountSkewCostFunction {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            stats: SkewStats::default(),
        }
    }
}

impl CostFunction for RegionCountSkewCostFunction {
    fn name(&self) -> &'static str {
        "region_count_skew"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn is_needed(&self, cluster: &ClusterState) -> bool {
        cluster.num_servers() > 1
    }

    fn prepare(&mut self, cluster: &ClusterState) {
        self.stats = SkewStats::new(
            (0..cluster.num_servers()).map(|s| cluster.region_count(s) as f64),
            true,
        );
    }

    fn cost(&self) -> f64 {
        self.stats.cost()
    }

    fn region_moved(&mut self, cluster: &ClusterState, mv: &RegionMove) {
        if mv.from == mv.to {
            return;
        }
        let from = cluster.region_count(mv.from) as f64;
        let to = cluster.region_count(mv.to) as f64;
        self.stats.update(from + 1.0, from);
        self.stats.update(to - 1.0, to);
    }
}

/// Skew of each table's region counts across servers, averaged over tables
#[derive(Debug, Clone)]
pub struct TableSkewCostFunction {
    weight: f64,
    tables: Vec<SkewStats>,
    costs: Vec<f64>,
    sum: f64,
}

impl TableSkewCostFunction {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            tables: Vec::new(),
            costs: Vec::new(),
            sum: 0.0,
        }
    }
}

impl CostFunction for TableSkewCostFunction {
    fn name(&self) -> &'static str {
        "table_skew"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn is_needed(&self, cluster: &ClusterState) -> bool {
        cluster.num_servers() > 1 && cluster.num_tables() > 0
    }

    fn prepare(&mut self, cluster: &ClusterState) {
        self.tables = (0..cluster.num_tables())
            .map(|t| {
                SkewStats::new(
                    cluster.table_region_counts(t).iter().map(|&c| f64::from(c)),
                    true,
                )
            })
            .collect();
        self.costs = self.tables.iter().map(SkewStats::cost).collect();
        self.sum = self.costs.iter().sum();
    }

    fn cost(&self) -> f64 {
        if self.tables.is_empty() {
            return 0.0;
        }
        (self.sum / self.tables.len() as f64).clamp(0.0, 1.0)
    }

    fn region_moved(&mut self, cluster: &ClusterState, mv: &RegionMove) {
        if mv.from == mv.to {
            return;
        }
        let table = cluster.table_of_region(mv.region);
        let from = f64::from(cluster.table_region_count(table, mv.from));
        let to = f64::from(cluster.table_region_count(table, mv.to));

        let stats = &mut self.tables[table];
        stats.update(from + 1.0, from);
        stats.update(to - 1.0, to);

        let cost = stats.cost();
        self.sum += cost - self.costs[table];
        self.costs[table] = cost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ServerRegions;
    use crate::types::{RegionInfo, ServerName};

    fn cluster_with_counts(counts: &[usize], table: &str) -> ClusterState {
        let mut map = ServerRegions::new();
        let mut id = 0;
        for (i, &count) in counts.iter().enumerate() {
            let regions = (0..count)
                .map(|_| {
                    id += 1;
                    RegionInfo::new(table, "", "", id)
                })
                .collect();
            map.insert(ServerName::new(&format!("host{:02}", i), 1, 1), regions);
        }
        ClusterState::builder(&map).build().unwrap()
    }

    #[test]
    fn test_skew_stats_bounds() {
        let even = SkewStats::new([2.0, 2.0, 2.0], true);
        assert_eq!(even.cost(), 0.0);

        let worst = SkewStats::new([6.0, 0.0, 0.0], true);
        assert!((worst.cost() - 1.0).abs() < 1e-9);

        // 7 over 3 servers cannot do better than 3/2/2
        let best_uneven = SkewStats::new([3.0, 2.0, 2.0], true);
        assert!(best_uneven.cost() < 1e-9);

        let single = SkewStats::new([5.0], true);
        assert_eq!(single.cost(), 0.0);
    }

    #[test]
    fn test_region_count_skew_ordering() {
        let mut f = RegionCountSkewCostFunction::new(1.0);

        f.prepare(&cluster_with_counts(&[3, 3, 3, 3], "t"));
        let balanced = f.cost();

        f.prepare(&cluster_with_counts(&[5, 3, 2, 2], "t"));
        let mild = f.cost();

        f.prepare(&cluster_with_counts(&[12, 0, 0, 0], "t"));
        let worst = f.cost();

        assert_eq!(balanced, 0.0);
        assert!(mild > balanced);
        assert!(worst > mild);
        assert!(worst <= 1.0);
    }

    #[test]
    fn test_region_count_skew_incremental() {
        let mut cluster = cluster_with_counts(&[4, 0, 1], "t");
        let mut f = RegionCountSkewCostFunction::new(1.0);
        f.prepare(&cluster);

        let region = cluster.regions_on_server(0)[0];
        let mv = RegionMove::new(region, 0, 1);
        cluster.move_region(region, 0, 1).unwrap();
        f.region_moved(&cluster, &mv);

        let mut fresh = RegionCountSkewCostFunction::new(1.0);
        fresh.prepare(&cluster);
        assert!((f.cost() - fresh.cost()).abs() < 1e-12);
    }

    #[test]
    fn test_table_skew_averages_tables() {
        // Table "a" all on one server, table "b" spread evenly
        let mut map = ServerRegions::new();
        map.insert(
            ServerName::new("h1", 1, 1),
            vec![
                RegionInfo::new("a", "", "", 1),
                RegionInfo::new("a", "", "", 2),
                RegionInfo::new("b", "", "", 3),
            ],
        );
        map.insert(
            ServerName::new("h2", 1, 1),
            vec![RegionInfo::new("b", "", "", 4)],
        );
        let mut cluster = ClusterState::builder(&map).build().unwrap();

        let mut f = TableSkewCostFunction::new(1.0);
        f.prepare(&cluster);
        assert!((f.cost() - 0.5).abs() < 1e-9);

        let mv = RegionMove::new(1, 0, 1);
        cluster.move_region(1, 0, 1).unwrap();
        f.region_moved(&cluster, &mv);
        assert!(f.cost().abs() < 1e-9);
    }
}
