//! Move cost function

use super::{scale, CostFunction};
use crate::cluster::{ClusterState, RegionMove};

/// Floor on the number of moves the cost is scaled against
const MIN_MAX_MOVES: usize = 600;

/// Penalizes relocating regions away from their initial servers
///
/// Keeps the balancer from reshuffling the whole cluster for a marginal gain.
/// The cost reaches 1 at `max(regions * max_move_percent, 600)` moved regions.
#[derive(Debug, Clone)]
pub struct MoveCostFunction {
    weight: f64,
    max_move_percent: f64,
    max_moves: usize,
    moved: usize,
}

impl MoveCostFunction {
    pub fn new(weight: f64, max_move_percent: f64) -> Self {
        Self {
            weight,
            max_move_percent,
            max_moves: MIN_MAX_MOVES,
            moved: 0,
        }
    }

    /// Regions currently off their initial server
    pub fn moved(&self) -> usize {
        self.moved
    }
}

impl CostFunction for MoveCostFunction {
    fn name(&self) -> &'static str {
        "move_cost"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn prepare(&mut self, cluster: &ClusterState) {
        let by_percent = (cluster.num_regions() as f64 * self.max_move_percent).floor() as usize;
        self.max_moves = by_percent.max(MIN_MAX_MOVES);
        self.moved = cluster.moved_region_count();
    }

    fn cost(&self) -> f64 {
        scale(0.0, self.max_moves as f64, self.moved as f64)
    }

    fn region_moved(&mut self, cluster: &ClusterState, mv: &RegionMove) {
        if mv.from == mv.to {
            return;
        }
        let initial = cluster.initial_server_of_region(mv.region);
        if mv.from == initial {
            self.moved += 1;
        } else if mv.to == initial {
            self.moved = self.moved.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ServerRegions;
    use crate::types::{RegionInfo, ServerName};

    #[test]
    fn test_move_cost_counts_distinct_regions() {
        let mut map = ServerRegions::new();
        map.insert(
            ServerName::new("a", 1, 1),
            (0..3).map(|i| RegionInfo::new("t", "", "", i)).collect(),
        );
        map.insert(ServerName::new("b", 1, 1), vec![]);
        map.insert(ServerName::new("c", 1, 1), vec![]);
        let mut cluster = ClusterState::builder(&map).build().unwrap();

        let mut f = MoveCostFunction::new(1.0, 0.25);
        f.prepare(&cluster);
        assert_eq!(f.cost(), 0.0);

        for mv in [
            RegionMove::new(0, 0, 1),
            RegionMove::new(0, 1, 2),
            RegionMove::new(1, 0, 1),
        ] {
            cluster.move_region(mv.region, mv.from, mv.to).unwrap();
            f.region_moved(&cluster, &mv);
        }
        assert_eq!(f.moved(), 2);
        assert!((f.cost() - 2.0 / 600.0).abs() < 1e-12);

        let back = RegionMove::new(0, 2, 0);
        cluster.move_region(back.region, back.from, back.to).unwrap();
        f.region_moved(&cluster, &back);
        assert_eq!(f.moved(), 1);
        assert_eq!(f.moved(), cluster.moved_region_count());
    }
}
