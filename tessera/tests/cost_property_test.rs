//! Property tests for the cost function family and the search loop
//!
//! Random clusters with replicas, shared hosts, two racks, load and locality
//! hints are pushed through random move sequences. After every move each
//! incrementally maintained cost must match a fresh full scan, and every
//! cost must stay within [0, 1.01].

use proptest::prelude::*;
use std::collections::HashMap;
use tessera::{
    BalancerConfig, ClusterState, CostFunctions, LocalityHints, RegionInfo, RegionLoad,
    RegionLoadHints, RegionMove, ServerName, ServerRegions, StochasticBalancer,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct GroupShape {
    replicas: usize,
    placement: Vec<usize>,
    table: u8,
    load: u64,
}

#[derive(Debug, Clone)]
struct ClusterShape {
    servers: usize,
    shared_hosts: bool,
    groups: Vec<GroupShape>,
}

fn arb_group() -> impl Strategy<Value = GroupShape> {
    (
        1usize..4,
        prop::collection::vec(0usize..64, 3),
        0u8..3,
        0u64..500,
    )
        .prop_map(|(replicas, placement, table, load)| GroupShape {
            replicas,
            placement,
            table,
            load,
        })
}

fn arb_cluster() -> impl Strategy<Value = ClusterShape> {
    (
        2usize..7,
        any::<bool>(),
        prop::collection::vec(arb_group(), 0..25),
    )
        .prop_map(|(servers, shared_hosts, groups)| ClusterShape {
            servers,
            shared_hosts,
            groups,
        })
}

fn rack_by_port(server: &ServerName) -> String {
    format!("rack{}", server.port % 2)
}

struct Built {
    map: ServerRegions,
    loads: RegionLoadHints,
    locality: LocalityHints,
}

fn build(shape: &ClusterShape) -> Built {
    let names: Vec<ServerName> = (0..shape.servers)
        .map(|i| {
            let host = if shape.shared_hosts { i / 2 } else { i };
            ServerName::new(&format!("host{}", host), 16020 + i as u16, 1)
        })
        .collect();

    let mut map: ServerRegions = names.iter().map(|n| (n.clone(), Vec::new())).collect();
    let mut loads = RegionLoadHints::new();
    let mut locality = LocalityHints::new();

    for (g, group) in shape.groups.iter().enumerate() {
        let primary = RegionInfo::new(
            &format!("t{}", group.table),
            &format!("{:04}", g),
            &format!("{:04}", g + 1),
            g as u64,
        );
        for replica_id in 0..group.replicas {
            let region = primary.replica(replica_id as u32);
            let server = &names[group.placement[replica_id] % shape.servers];
            if let Some(hosted) = map.get_mut(server) {
                hosted.push(region.clone());
            }

            loads.insert(
                region.clone(),
                vec![
                    RegionLoad {
                        read_requests: 0,
                        write_requests: group.load / 2,
                        store_file_size_mb: group.load as f64,
                        memstore_size_mb: (group.load % 17) as f64,
                    },
                    RegionLoad {
                        read_requests: group.load,
                        write_requests: group.load,
                        store_file_size_mb: group.load as f64 + 10.0,
                        memstore_size_mb: (group.load % 13) as f64,
                    },
                ],
            );

            let local = &names[(group.placement[replica_id] + 1) % shape.servers];
            locality.insert(region, HashMap::from([(local.clone(), 0.75)]));
        }
    }

    Built {
        map,
        loads,
        locality,
    }
}

fn assert_costs_match(incremental: &CostFunctions, cluster: &ClusterState, config: &BalancerConfig) {
    let mut fresh = CostFunctions::from_config(config);
    fresh.prepare(cluster);

    for (a, b) in incremental.breakdown().iter().zip(fresh.breakdown()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.active, b.active);
        assert!(
            (a.cost - b.cost).abs() < 1e-6,
            "{}: incremental {} vs full {}",
            a.name,
            a.cost,
            b.cost
        );
        assert!((0.0..=1.01).contains(&a.cost), "{} out of range: {}", a.name, a.cost);
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_incremental_costs_match_full_recompute(
        shape in arb_cluster(),
        moves in prop::collection::vec((any::<usize>(), any::<usize>()), 0..40),
    ) {
        let built = build(&shape);
        let mut cluster = ClusterState::builder(&built.map)
            .racks(&rack_by_port)
            .region_loads(&built.loads)
            .locality(&built.locality)
            .build()
            .unwrap();

        let config = BalancerConfig::default();
        let mut costs = CostFunctions::from_config(&config);
        costs.prepare(&cluster);
        assert_costs_match(&costs, &cluster, &config);

        if cluster.num_regions() == 0 {
            return Ok(());
        }

        for (region_pick, server_pick) in moves {
            let region = region_pick % cluster.num_regions();
            let from = cluster.server_of_region(region);
            let to = server_pick % cluster.num_servers();
            if from == to {
                continue;
            }

            cluster.move_region(region, from, to).unwrap();
            costs.region_moved(&cluster, &RegionMove::new(region, from, to));
            assert_costs_match(&costs, &cluster, &config);
        }
    }

    #[test]
    fn test_balance_never_increases_cost(shape in arb_cluster(), seed in any::<u64>()) {
        let built = build(&shape);
        let mut cluster = ClusterState::builder(&built.map)
            .racks(&rack_by_port)
            .region_loads(&built.loads)
            .locality(&built.locality)
            .build()
            .unwrap();

        let balancer = StochasticBalancer::new(BalancerConfig {
            seed: Some(seed),
            max_steps: 2_000,
            ..Default::default()
        })
        .unwrap();

        let result = balancer.balance(&mut cluster).unwrap();
        prop_assert!(
            result.final_cost <= result.initial_cost + 1e-6,
            "cost went from {} to {}",
            result.initial_cost,
            result.final_cost
        );
        prop_assert_eq!(result.plans.len(), cluster.moved_region_count());
        prop_assert_eq!(result.assignment.values().map(Vec::len).sum::<usize>(), cluster.num_regions());
    }
}
