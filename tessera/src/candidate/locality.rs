use super::CandidateGenerator;
use crate::cluster::{Action, ClusterState};
use rand::{Rng, RngCore};

const DEFAULT_SAMPLES: usize = 16;

/// Move a region to the server where most of its data is local
///
/// Samples a bounded number of random regions and proposes the first one
/// that would gain locality by moving.
#[derive(Debug, Clone, Copy)]
pub struct LocalityCandidateGenerator {
    samples: usize,
}

impl LocalityCandidateGenerator {
    pub fn new(samples: usize) -> Self {
        Self {
            samples: samples.max(1),
        }
    }
}

impl Default for LocalityCandidateGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLES)
    }
}

impl CandidateGenerator for LocalityCandidateGenerator {
    fn name(&self) -> &'static str {
        "locality"
    }

    fn generate(&self, cluster: &ClusterState, rng: &mut dyn RngCore) -> Action {
        let n = cluster.num_regions();
        if !cluster.has_locality() || n == 0 || cluster.num_servers() < 2 {
            return Action::Null;
        }

        for _ in 0..self.samples.min(n) {
            let region = rng.gen_range(0..n);
            let current = cluster.server_of_region(region);
            let Some((best, fraction)) = cluster.best_locality(region) else {
                continue;
            };
            if best != current && fraction > cluster.locality(region, current) {
                return Action::Move {
                    region,
                    from: current,
                    to: best,
                };
            }
        }

        Action::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{LocalityHints, ServerRegions};
    use crate::types::{RegionInfo, ServerName};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    #[test]
    fn test_proposes_best_locality_server() {
        let a = ServerName::new("a", 1, 1);
        let b = ServerName::new("b", 1, 1);
        let r = RegionInfo::new("t", "", "", 1);

        let mut map = ServerRegions::new();
        map.insert(a.clone(), vec![r.clone()]);
        map.insert(b.clone(), vec![]);

        let mut hints = LocalityHints::new();
        hints.insert(r, HashMap::from([(a, 0.2), (b, 0.9)]));

        let state = ClusterState::builder(&map).locality(&hints).build().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert_eq!(
            LocalityCandidateGenerator::default().generate(&state, &mut rng),
            Action::Move {
                region: 0,
                from: 0,
                to: 1
            }
        );
    }

    #[test]
    fn test_no_hints_is_null() {
        let mut map = ServerRegions::new();
        map.insert(
            ServerName::new("a", 1, 1),
            vec![RegionInfo::new("t", "", "", 1)],
        );
        map.insert(ServerName::new("b", 1, 1), vec![]);
        let state = ClusterState::builder(&map).build().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(LocalityCandidateGenerator::default()
            .generate(&state, &mut rng)
            .is_null());
    }
}
