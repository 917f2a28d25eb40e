use super::{random_region, CandidateGenerator};
use crate::cluster::{Action, ClusterState};
use rand::RngCore;

/// Move a region from the most loaded server to the least loaded one
///
/// Load is the region count. Ties go to the lowest server index.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadCandidateGenerator;

impl CandidateGenerator for LoadCandidateGenerator {
    fn name(&self) -> &'static str {
        "load"
    }

    fn generate(&self, cluster: &ClusterState, rng: &mut dyn RngCore) -> Action {
        if cluster.num_servers() < 2 {
            return Action::Null;
        }

        let counts = cluster.region_counts();
        let mut most = 0;
        let mut least = 0;
        for (server, &count) in counts.iter().enumerate() {
            if count > counts[most] {
                most = server;
            }
            if count < counts[least] {
                least = server;
            }
        }

        if counts[most] <= counts[least] + 1 {
            return Action::Null;
        }

        match random_region(cluster, most, rng) {
            Some(region) => Action::Move {
                region,
                from: most,
                to: least,
            },
            None => Action::Null,
        }
    }
}
