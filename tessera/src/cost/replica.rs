//! Replica co-location cost functions
//!
//! Members of a replica group placed in the same failure domain add a
//! penalty of `(n - 1)^2` for `n` co-located members, so three replicas on
//! one host cost more than two separate pairs. The summed penalty is scaled
//! between the lowest penalty the domain count allows (replicas spread as
//! evenly as possible) and the highest (every group fully co-located), which
//! makes the cost zero whenever no sequence of moves could lower it.

use super::{scale, CostFunction};
use crate::cluster::{ClusterState, RegionMove};

/// Penalty for `count` members of one group sharing a domain
pub(crate) fn colocation_penalty(count: u32) -> u64 {
    if count <= 1 {
        0
    } else {
        let extra = u64::from(count - 1);
        extra * extra
    }
}

/// Lowest penalty reachable for a group of `size` members over `domains` domains
pub(crate) fn min_group_penalty(size: usize, domains: usize) -> u64 {
    if domains == 0 {
        return colocation_penalty(size as u32);
    }
    let per_domain = (size / domains) as u32;
    let remainder = (size % domains) as u64;
    let rest = (domains as u64).saturating_sub(remainder);
    remainder * colocation_penalty(per_domain + 1) + rest * colocation_penalty(per_domain)
}

/// Placement domain at which co-location is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Domain {
    Server,
    Host,
    Rack,
}

impl Domain {
    /// Host granularity when servers share hosts, otherwise per server
    pub(crate) fn for_hosts(cluster: &ClusterState) -> Self {
        if cluster.multi_servers_per_host() {
            Domain::Host
        } else {
            Domain::Server
        }
    }

    pub(crate) fn count(self, cluster: &ClusterState) -> usize {
        match self {
            Domain::Server => cluster.num_servers(),
            Domain::Host => cluster.num_hosts(),
            Domain::Rack => cluster.num_racks(),
        }
    }

    pub(crate) fn of_server(self, cluster: &ClusterState, server: usize) -> usize {
        match self {
            Domain::Server => server,
            Domain::Host => cluster.host_of_server(server),
            Domain::Rack => cluster.rack_of_server(server),
        }
    }

    pub(crate) fn group_count(self, cluster: &ClusterState, domain: usize, group: usize) -> u32 {
        match self {
            Domain::Server => cluster.group_count_on_server(domain, group),
            Domain::Host => cluster.group_count_on_host(domain, group),
            Domain::Rack => cluster.group_count_on_rack(domain, group),
        }
    }

    /// Servers belonging to one domain
    pub(crate) fn servers(self, cluster: &ClusterState, domain: usize) -> Vec<usize> {
        match self {
            Domain::Server => vec![domain],
            Domain::Host => cluster.servers_on_host(domain).to_vec(),
            Domain::Rack => cluster.servers_in_rack(domain).to_vec(),
        }
    }

    /// (group, members) pairs in one domain, ordered by group
    pub(crate) fn groups(self, cluster: &ClusterState, domain: usize) -> Vec<(usize, u32)> {
        let mut groups: Vec<(usize, u32)> = match self {
            Domain::Server => cluster.groups_on_server(domain).collect(),
            Domain::Host => cluster.groups_on_host(domain).collect(),
            Domain::Rack => cluster.groups_in_rack(domain).collect(),
        };
        groups.sort_unstable();
        groups
    }

    fn penalty(self, cluster: &ClusterState, domain: usize) -> u64 {
        match self {
            Domain::Server => cluster
                .groups_on_server(domain)
                .map(|(_, c)| colocation_penalty(c))
                .sum(),
            Domain::Host => cluster
                .groups_on_host(domain)
                .map(|(_, c)| colocation_penalty(c))
                .sum(),
            Domain::Rack => cluster
                .groups_in_rack(domain)
                .map(|(_, c)| colocation_penalty(c))
                .sum(),
        }
    }
}

/// Shared accumulator for the host and rack variants
#[derive(Debug, Clone)]
struct Colocation {
    domain: Domain,
    total: u64,
    min: u64,
    max: u64,
}

impl Colocation {
    fn new(domain: Domain) -> Self {
        Self {
            domain,
            total: 0,
            min: 0,
            max: 0,
        }
    }

    fn prepare(&mut self, cluster: &ClusterState, domain: Domain) {
        self.domain = domain;
        let domains = domain.count(cluster);

        self.min = 0;
        self.max = 0;
        for group in 0..cluster.num_groups() {
            let size = cluster.group_size(group);
            if size > 1 {
                self.min += min_group_penalty(size, domains);
                self.max += colocation_penalty(size as u32);
            }
        }

        self.total = (0..domains).map(|d| domain.penalty(cluster, d)).sum();
    }

    fn cost(&self) -> f64 {
        scale(self.min as f64, self.max as f64, self.total as f64)
    }

    fn region_moved(&mut self, cluster: &ClusterState, mv: &RegionMove) {
        let from = self.domain.of_server(cluster, mv.from);
        let to = self.domain.of_server(cluster, mv.to);
        if from == to {
            return;
        }
        let group = cluster.group_of_region(mv.region);

        // Counts are read after the move was applied
        let left = self.domain.group_count(cluster, from, group);
        let joined = self.domain.group_count(cluster, to, group);
        self.total -= colocation_penalty(left + 1) - colocation_penalty(left);
        self.total += colocation_penalty(joined) - colocation_penalty(joined.saturating_sub(1));
    }
}

/// Penalizes replicas of the same region sharing a server
///
/// When several servers run on one host the penalty is also measured per
/// host, and the cost is the larger of the two scaled values.
#[derive(Debug, Clone)]
pub struct RegionReplicaHostCostFunction {
    weight: f64,
    servers: Colocation,
    hosts: Option<Colocation>,
}

impl RegionReplicaHostCostFunction {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            servers: Colocation::new(Domain::Server),
            hosts: None,
        }
    }

    /// Sum of co-location penalties before scaling, at host granularity
    /// when servers share hosts
    pub fn raw_penalty(&self) -> u64 {
        match &self.hosts {
            Some(hosts) => hosts.total,
            None => self.servers.total,
        }
    }

    /// Sum of per-server co-location penalties before scaling
    pub fn server_penalty(&self) -> u64 {
        self.servers.total
    }
}

impl CostFunction for RegionReplicaHostCostFunction {
    fn name(&self) -> &'static str {
        "replica_host"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn is_needed(&self, cluster: &ClusterState) -> bool {
        cluster.has_region_replicas()
    }

    fn prepare(&mut self, cluster: &ClusterState) {
        self.servers.prepare(cluster, Domain::Server);
        self.hosts = match Domain::for_hosts(cluster) {
            Domain::Host => {
                let mut hosts = Colocation::new(Domain::Host);
                hosts.prepare(cluster, Domain::Host);
                Some(hosts)
            }
            _ => None,
        };
    }

    fn cost(&self) -> f64 {
        let servers = self.servers.cost();
        match &self.hosts {
            Some(hosts) => servers.max(hosts.cost()),
            None => servers,
        }
    }

    fn region_moved(&mut self, cluster: &ClusterState, mv: &RegionMove) {
        self.servers.region_moved(cluster, mv);
        if let Some(hosts) = &mut self.hosts {
            hosts.region_moved(cluster, mv);
        }
    }
}

/// Penalizes replicas of the same region sharing a rack
#[derive(Debug, Clone)]
pub struct RegionReplicaRackCostFunction {
    weight: f64,
    inner: Colocation,
}

impl RegionReplicaRackCostFunction {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            inner: Colocation::new(Domain::Rack),
        }
    }

    pub fn raw_penalty(&self) -> u64 {
        self.inner.total
    }
}

impl CostFunction for RegionReplicaRackCostFunction {
    fn name(&self) -> &'static str {
        "replica_rack"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn is_needed(&self, cluster: &ClusterState) -> bool {
        cluster.has_region_replicas() && cluster.num_racks() > 1
    }

    fn prepare(&mut self, cluster: &ClusterState) {
        self.inner.prepare(cluster, Domain::Rack);
    }

    fn cost(&self) -> f64 {
        self.inner.cost()
    }

    fn region_moved(&mut self, cluster: &ClusterState, mv: &RegionMove) {
        self.inner.region_moved(cluster, mv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ServerRegions;
    use crate::types::{RegionInfo, ServerName};

    #[test]
    fn test_penalty_is_superlinear() {
        assert_eq!(colocation_penalty(0), 0);
        assert_eq!(colocation_penalty(1), 0);
        assert_eq!(colocation_penalty(2), 1);
        assert_eq!(colocation_penalty(3), 4);
        // Three together is worse than two pairs
        assert!(colocation_penalty(3) > 2 * colocation_penalty(2));
    }

    #[test]
    fn test_min_group_penalty() {
        assert_eq!(min_group_penalty(3, 5), 0);
        assert_eq!(min_group_penalty(3, 2), 1);
        assert_eq!(min_group_penalty(4, 2), 2);
        assert_eq!(min_group_penalty(3, 1), 4);
        assert_eq!(min_group_penalty(5, 2), 1 + 4);
    }

    fn rack_of(s: &ServerName) -> String {
        if s.host.ends_with('1') {
            "rack1".to_string()
        } else {
            "rack2".to_string()
        }
    }

    #[test]
    fn test_rack_cost_zero_when_spread_impossible() {
        // Three replicas over two racks: one rack must hold two of them
        let r = RegionInfo::new("t", "", "", 1);
        let mut map = ServerRegions::new();
        map.insert(ServerName::new("host1", 1, 1), vec![r.clone()]);
        map.insert(ServerName::new("host11", 1, 1), vec![r.replica(1)]);
        map.insert(ServerName::new("host2", 1, 1), vec![r.replica(2)]);

        let cluster = ClusterState::builder(&map).racks(&rack_of).build().unwrap();
        let mut rack = RegionReplicaRackCostFunction::new(1.0);
        assert!(rack.is_needed(&cluster));
        rack.prepare(&cluster);
        assert_eq!(rack.raw_penalty(), 1);
        assert_eq!(rack.cost(), 0.0);
    }

    #[test]
    fn test_rack_cost_positive_when_spread_possible() {
        let r = RegionInfo::new("t", "", "", 1);
        let mut map = ServerRegions::new();
        map.insert(ServerName::new("host1", 1, 1), vec![r.clone()]);
        map.insert(ServerName::new("host11", 1, 1), vec![r.replica(1)]);
        map.insert(ServerName::new("host2", 1, 1), vec![]);

        let mut cluster = ClusterState::builder(&map).racks(&rack_of).build().unwrap();
        let mut rack = RegionReplicaRackCostFunction::new(1.0);
        rack.prepare(&cluster);
        assert_eq!(rack.cost(), 1.0);

        // Moving the replica to the other rack clears the penalty
        let replica = cluster.region_index(&r.replica(1)).unwrap();
        let mv = RegionMove::new(replica, 1, 2);
        cluster.move_region(mv.region, mv.from, mv.to).unwrap();
        rack.region_moved(&cluster, &mv);
        assert_eq!(rack.raw_penalty(), 0);
        assert_eq!(rack.cost(), 0.0);
    }

    #[test]
    fn test_host_cost_uses_hosts_when_shared() {
        // Two servers on the same host count as co-located
        let r = RegionInfo::new("t", "", "", 1);
        let mut map = ServerRegions::new();
        map.insert(ServerName::new("a", 1, 1), vec![r.clone()]);
        map.insert(ServerName::new("a", 2, 1), vec![r.replica(1)]);
        map.insert(ServerName::new("b", 1, 1), vec![]);

        let cluster = ClusterState::builder(&map).build().unwrap();
        let mut host = RegionReplicaHostCostFunction::new(1.0);
        host.prepare(&cluster);
        assert_eq!(host.raw_penalty(), 1);
        assert_eq!(host.server_penalty(), 0);
        assert_eq!(host.cost(), 1.0);
    }

    #[test]
    fn test_host_cost_sees_shared_server_on_single_host() {
        // One host, so the host spread cannot improve, but the pair could
        // still be split across its two servers
        let p = RegionInfo::new("t", "", "a", 1);
        let other = RegionInfo::new("t", "a", "", 2);
        let mut map = ServerRegions::new();
        map.insert(ServerName::new("localhost", 1, 1), vec![p.clone(), p.replica(1)]);
        map.insert(ServerName::new("localhost", 2, 1), vec![other]);

        let mut cluster = ClusterState::builder(&map).build().unwrap();
        let mut host = RegionReplicaHostCostFunction::new(1.0);
        host.prepare(&cluster);
        assert_eq!(host.raw_penalty(), 1);
        assert_eq!(host.server_penalty(), 1);
        assert_eq!(host.cost(), 1.0);

        let replica = cluster.region_index(&p.replica(1)).unwrap();
        let mv = RegionMove::new(replica, 0, 1);
        cluster.move_region(mv.region, mv.from, mv.to).unwrap();
        host.region_moved(&cluster, &mv);
        assert_eq!(host.server_penalty(), 0);
        assert_eq!(host.cost(), 0.0);
    }

    #[test]
    fn test_host_cost_not_needed_without_replicas() {
        let mut map = ServerRegions::new();
        map.insert(
            ServerName::new("a", 1, 1),
            vec![RegionInfo::new("t", "", "", 1)],
        );
        let cluster = ClusterState::builder(&map).build().unwrap();
        let host = RegionReplicaHostCostFunction::new(1.0);
        assert!(!host.is_needed(&cluster));
    }
}
