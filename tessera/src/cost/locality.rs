//! Data locality cost function

use super::CostFunction;
use crate::cluster::{ClusterState, RegionMove};

/// Penalizes regions hosted away from their local data
///
/// The cost is `1 - achieved / best`, where `achieved` sums each region's
/// locality on its current server and `best` sums each region's locality on
/// its best server.
#[derive(Debug, Clone)]
pub struct LocalityCostFunction {
    weight: f64,
    achieved: f64,
    best: f64,
}

impl LocalityCostFunction {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            achieved: 0.0,
            best: 0.0,
        }
    }
}

impl CostFunction for LocalityCostFunction {
    fn name(&self) -> &'static str {
        "locality"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn is_needed(&self, cluster: &ClusterState) -> bool {
        cluster.has_locality()
    }

    fn prepare(&mut self, cluster: &ClusterState) {
        self.achieved = 0.0;
        self.best = 0.0;
        for region in 0..cluster.num_regions() {
            self.achieved += cluster.locality(region, cluster.server_of_region(region));
            if let Some((_, best)) = cluster.best_locality(region) {
                self.best += best;
            }
        }
    }

    fn cost(&self) -> f64 {
        if self.best <= 0.0 {
            return 0.0;
        }
        (1.0 - self.achieved / self.best).clamp(0.0, 1.0)
    }

    fn region_moved(&mut self, cluster: &ClusterState, mv: &RegionMove) {
        self.achieved +=
            cluster.locality(mv.region, mv.to) - cluster.locality(mv.region, mv.from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{LocalityHints, ServerRegions};
    use crate::types::{RegionInfo, ServerName};
    use std::collections::HashMap;

    #[test]
    fn test_locality_cost() {
        let a = ServerName::new("a", 1, 1);
        let b = ServerName::new("b", 1, 1);
        let r1 = RegionInfo::new("t", "", "m", 1);
        let r2 = RegionInfo::new("t", "m", "", 2);

        let mut map = ServerRegions::new();
        map.insert(a.clone(), vec![r1.clone(), r2.clone()]);
        map.insert(b.clone(), vec![]);

        let mut hints = LocalityHints::new();
        hints.insert(r1.clone(), HashMap::from([(a.clone(), 1.0)]));
        hints.insert(r2.clone(), HashMap::from([(a.clone(), 0.0), (b.clone(), 1.0)]));

        let mut cluster = ClusterState::builder(&map).locality(&hints).build().unwrap();
        let mut f = LocalityCostFunction::new(1.0);
        assert!(f.is_needed(&cluster));
        f.prepare(&cluster);
        assert!((f.cost() - 0.5).abs() < 1e-9);

        let idx = cluster.region_index(&r2).unwrap();
        let mv = RegionMove::new(idx, 0, 1);
        cluster.move_region(idx, 0, 1).unwrap();
        f.region_moved(&cluster, &mv);
        assert!(f.cost().abs() < 1e-9);
    }

    #[test]
    fn test_locality_not_needed_without_hints() {
        let mut map = ServerRegions::new();
        map.insert(
            ServerName::new("a", 1, 1),
            vec![RegionInfo::new("t", "", "", 1)],
        );
        let cluster = ClusterState::builder(&map).build().unwrap();
        assert!(!LocalityCostFunction::new(1.0).is_needed(&cluster));
    }
}
