use super::CandidateGenerator;
use crate::cluster::{Action, ClusterState};
use crate::cost::Domain;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

/// Move one member of a co-located replica group into a less crowded domain
///
/// Only proposes moves that strictly lower the group's penalty: the target
/// domain must end up with fewer members than the source had. `allowed`
/// filters (source, target) domain pairs. Returns [`Action::Null`] when every
/// group is already spread as far as possible.
fn spread_replicas(
    cluster: &ClusterState,
    domain: Domain,
    allowed: &dyn Fn(usize, usize) -> bool,
    rng: &mut dyn RngCore,
) -> Action {
    let n = domain.count(cluster);
    if n < 2 || !cluster.has_region_replicas() {
        return Action::Null;
    }

    let start = rng.gen_range(0..n);
    for offset in 0..n {
        let source = (start + offset) % n;

        for (group, count) in domain.groups(cluster, source) {
            if count < 2 {
                continue;
            }

            let mut fewest = u32::MAX;
            let mut targets = Vec::new();
            for target in (0..n).filter(|&d| d != source && allowed(source, d)) {
                let c = domain.group_count(cluster, target, group);
                if c + 1 >= count {
                    continue;
                }
                if c < fewest {
                    fewest = c;
                    targets.clear();
                }
                if c == fewest {
                    targets.push(target);
                }
            }
            let Some(&target) = targets.choose(rng) else {
                continue;
            };

            let Some(&region) = cluster
                .group_members(group)
                .iter()
                .find(|&&r| domain.of_server(cluster, cluster.server_of_region(r)) == source)
            else {
                continue;
            };
            let Some(&to) = domain.servers(cluster, target).choose(rng) else {
                continue;
            };

            return Action::Move {
                region,
                from: cluster.server_of_region(region),
                to,
            };
        }
    }

    Action::Null
}

fn any_pair(_: usize, _: usize) -> bool {
    true
}

/// Separate replicas sharing a host, then replicas sharing a server
///
/// Once hosts are spread as far as they can be, the remaining server-level
/// overlap is resolved by moves between servers of the same host, which
/// leave the host spread untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplicaHostCandidateGenerator;

impl CandidateGenerator for ReplicaHostCandidateGenerator {
    fn name(&self) -> &'static str {
        "replica_host"
    }

    fn generate(&self, cluster: &ClusterState, rng: &mut dyn RngCore) -> Action {
        if Domain::for_hosts(cluster) == Domain::Server {
            return spread_replicas(cluster, Domain::Server, &any_pair, rng);
        }

        let action = spread_replicas(cluster, Domain::Host, &any_pair, rng);
        if !action.is_null() {
            return action;
        }
        let same_host =
            |from: usize, to: usize| cluster.host_of_server(from) == cluster.host_of_server(to);
        spread_replicas(cluster, Domain::Server, &same_host, rng)
    }
}

/// Separate replicas sharing a rack
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplicaRackCandidateGenerator;

impl CandidateGenerator for ReplicaRackCandidateGenerator {
    fn name(&self) -> &'static str {
        "replica_rack"
    }

    fn generate(&self, cluster: &ClusterState, rng: &mut dyn RngCore) -> Action {
        spread_replicas(cluster, Domain::Rack, &any_pair, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ServerRegions;
    use crate::types::{RegionInfo, ServerName};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rack_of(s: &ServerName) -> String {
        if s.host.ends_with('1') {
            "rack1".to_string()
        } else {
            "rack2".to_string()
        }
    }

    #[test]
    fn test_host_generator_separates_colocated_replicas() {
        let r = RegionInfo::new("t", "", "", 1);
        let mut map = ServerRegions::new();
        map.insert(ServerName::new("a", 1, 1), vec![r.clone(), r.replica(1)]);
        map.insert(ServerName::new("b", 1, 1), vec![]);
        let mut state = ClusterState::builder(&map).build().unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let action = ReplicaHostCandidateGenerator.generate(&state, &mut rng);
        match action {
            Action::Move { from, to, .. } => {
                assert_eq!(from, 0);
                assert_eq!(to, 1);
            }
            other => panic!("expected a move, got {:?}", other),
        }

        state.apply(&action).unwrap();
        assert!(ReplicaHostCandidateGenerator
            .generate(&state, &mut rng)
            .is_null());
    }

    #[test]
    fn test_host_generator_splits_server_pair_within_host() {
        // Hosts a and b are already spread as far as three replicas allow
        let p = RegionInfo::new("t", "", "m", 1);
        let other = RegionInfo::new("t", "m", "", 2);
        let mut map = ServerRegions::new();
        map.insert(ServerName::new("a", 1, 1), vec![p.clone(), p.replica(1)]);
        map.insert(ServerName::new("a", 2, 1), vec![other]);
        map.insert(ServerName::new("b", 1, 1), vec![p.replica(2)]);
        let mut state = ClusterState::builder(&map).build().unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let action = ReplicaHostCandidateGenerator.generate(&state, &mut rng);
        match action {
            Action::Move { from, to, .. } => {
                assert_eq!(state.server(from).port, 1);
                assert_eq!(state.server(from).host, "a");
                assert_eq!(state.server(to).port, 2);
                assert_eq!(state.server(to).host, "a");
            }
            other => panic!("expected a move, got {:?}", other),
        }

        state.apply(&action).unwrap();
        assert!(ReplicaHostCandidateGenerator
            .generate(&state, &mut rng)
            .is_null());
    }

    #[test]
    fn test_rack_generator_null_when_spread_is_impossible() {
        let r = RegionInfo::new("t", "", "", 1);
        let mut map = ServerRegions::new();
        map.insert(ServerName::new("host1", 1, 1), vec![r.clone()]);
        map.insert(ServerName::new("host11", 1, 1), vec![r.replica(1)]);
        map.insert(ServerName::new("host2", 1, 1), vec![r.replica(2)]);
        let state = ClusterState::builder(&map).racks(&rack_of).build().unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        assert!(ReplicaRackCandidateGenerator
            .generate(&state, &mut rng)
            .is_null());
    }

    #[test]
    fn test_rack_generator_moves_to_empty_rack() {
        let r = RegionInfo::new("t", "", "", 1);
        let mut map = ServerRegions::new();
        map.insert(ServerName::new("host1", 1, 1), vec![r.clone()]);
        map.insert(ServerName::new("host11", 1, 1), vec![r.replica(1)]);
        map.insert(ServerName::new("host2", 1, 1), vec![]);
        let state = ClusterState::builder(&map).racks(&rack_of).build().unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        match ReplicaRackCandidateGenerator.generate(&state, &mut rng) {
            Action::Move { to, .. } => assert_eq!(state.server(to).host, "host2"),
            other => panic!("expected a move, got {:?}", other),
        }
    }
}
