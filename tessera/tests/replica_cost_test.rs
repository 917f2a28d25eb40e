//! Replica co-location cost scenarios

mod common;

use common::{mock_cluster_servers, server};
use tessera::cost::RegionReplicaHostCostFunction;
use tessera::{ClusterState, CostFunction, ServerRegions};

fn host_cost(map: &ServerRegions) -> f64 {
    let cluster = ClusterState::builder(map).build().unwrap();
    let mut function = RegionReplicaHostCostFunction::new(1.0);
    function.prepare(&cluster);
    function.cost()
}

#[test]
fn test_replica_cost_bounds_on_mock_clusters() {
    let mocks: [&[usize]; 6] = [
        &[0, 0],
        &[1, 0, 3],
        &[4, 4, 4, 4],
        &[10, 0, 0, 0, 1],
        &[3, 3, 3, 3, 3],
        &[25, 1, 1, 1, 1, 1, 40],
    ];
    for counts in mocks {
        let cost = host_cost(&mock_cluster_servers(counts));
        assert!((0.0..=1.01).contains(&cost), "{:?} -> {}", counts, cost);
    }
}

#[test]
fn test_replica_cost_for_replicas() {
    let servers = [3, 3, 3, 3, 3];
    let mut map = mock_cluster_servers(&servers);
    assert_eq!(host_cost(&map), 0.0);

    // Replica of the first server's first region on the last server
    let primary = map[&server(0)][0].clone();
    let replica1 = primary.replica(1);
    map.get_mut(&server(4)).unwrap().push(replica1.clone());
    let different_server = host_cost(&map);
    assert_eq!(different_server, 0.0);

    // A second replica next to the first one
    map.get_mut(&server(4)).unwrap().push(replica1.replica(2));
    let same_server = host_cost(&map);
    assert!(same_server > 0.0);
    assert!(different_server < same_server);
}

#[test]
fn test_three_colocated_cost_more_than_two_pairs() {
    let servers = [3, 3, 3, 3, 3];

    // Replication 4: three members on the first server, one on the second
    let mut map = mock_cluster_servers(&servers);
    let primary = map[&server(0)][0].clone();
    map.get_mut(&server(0))
        .unwrap()
        .extend([primary.replica(1), primary.replica(2)]);
    map.get_mut(&server(1)).unwrap().push(primary.replica(3));
    let three_same_server = host_cost(&map);

    // Replication 4: a pair on the first server and a pair on the last
    let mut map = mock_cluster_servers(&servers);
    let primary = map[&server(0)][0].clone();
    map.get_mut(&server(0)).unwrap().push(primary.replica(1));
    map.get_mut(&server(4))
        .unwrap()
        .extend([primary.replica(2), primary.replica(3)]);
    let two_pairs = host_cost(&map);

    assert!(two_pairs > 0.0);
    assert!(two_pairs < three_same_server);
    assert!(three_same_server <= 1.0);
}
