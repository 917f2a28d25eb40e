use super::{random_region, CandidateGenerator};
use crate::cluster::{Action, ClusterState};
use rand::{Rng, RngCore};

/// Random move or swap between two random servers
///
/// Keeps the search from getting stuck where the targeted generators have
/// nothing to propose.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCandidateGenerator;

impl CandidateGenerator for RandomCandidateGenerator {
    fn name(&self) -> &'static str {
        "random"
    }

    fn generate(&self, cluster: &ClusterState, rng: &mut dyn RngCore) -> Action {
        let n = cluster.num_servers();
        if n < 2 {
            return Action::Null;
        }

        let this = rng.gen_range(0..n);
        let other = (this + rng.gen_range(1..n)) % n;

        let this_region = random_region(cluster, this, rng);
        let other_region = if rng.gen_bool(0.5) {
            random_region(cluster, other, rng)
        } else {
            None
        };

        match (this_region, other_region) {
            (None, None) => Action::Null,
            (Some(region), None) => Action::Move {
                region,
                from: this,
                to: other,
            },
            (None, Some(region)) => Action::Move {
                region,
                from: other,
                to: this,
            },
            (Some(from_region), Some(to_region)) => Action::Swap {
                from_server: this,
                from_region,
                to_server: other,
                to_region,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ServerRegions;
    use crate::types::{RegionInfo, ServerName};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_actions_are_valid() {
        let mut map = ServerRegions::new();
        map.insert(
            ServerName::new("a", 1, 1),
            (0..5).map(|i| RegionInfo::new("t", "", "", i)).collect(),
        );
        map.insert(
            ServerName::new("b", 1, 1),
            vec![RegionInfo::new("t", "", "", 10)],
        );
        map.insert(ServerName::new("c", 1, 1), vec![]);
        let mut cluster = ClusterState::builder(&map).build().unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut non_null = 0;
        for _ in 0..200 {
            let action = RandomCandidateGenerator.generate(&cluster, &mut rng);
            if action.is_null() {
                continue;
            }
            non_null += 1;
            cluster.apply(&action).unwrap();
        }
        assert!(non_null > 0);
        assert_eq!(cluster.num_regions(), 6);
    }

    #[test]
    fn test_single_server_is_null() {
        let mut map = ServerRegions::new();
        map.insert(
            ServerName::new("a", 1, 1),
            vec![RegionInfo::new("t", "", "", 1)],
        );
        let cluster = ClusterState::builder(&map).build().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(RandomCandidateGenerator.generate(&cluster, &mut rng).is_null());
    }
}
