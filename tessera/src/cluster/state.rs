//! Normalized cluster snapshot with O(1) region moves
//!
//! Built once per balancing run from a point-in-time server -> regions view
//! and exclusively owned by that run until it is discarded.

use super::{Action, LocalityHints, RegionLoadHints, RegionMove, ServerRegions};
use crate::error::{BalancerError, Result};
use crate::topology::{RackLookup, UNKNOWN_RACK};
use crate::types::{RegionInfo, RegionLoad, RegionPlan, ServerName};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Builder for [`ClusterState`]
///
/// ```ignore
/// let state = ClusterState::builder(&assignment)
///     .racks(&lookup)
///     .locality(&locality)
///     .build()?;
/// ```
pub struct ClusterStateBuilder<'a> {
    entries: Vec<(&'a ServerName, &'a Vec<RegionInfo>)>,
    region_loads: Option<&'a RegionLoadHints>,
    locality: Option<&'a LocalityHints>,
    racks: Option<&'a dyn RackLookup>,
}

impl<'a> ClusterStateBuilder<'a> {
    /// Attach historical region load samples
    pub fn region_loads(mut self, loads: &'a RegionLoadHints) -> Self {
        self.region_loads = Some(loads);
        self
    }

    /// Attach per-region locality hints
    pub fn locality(mut self, locality: &'a LocalityHints) -> Self {
        self.locality = Some(locality);
        self
    }

    /// Attach a rack lookup; without one every server shares a single rack
    pub fn racks(mut self, lookup: &'a dyn RackLookup) -> Self {
        self.racks = Some(lookup);
        self
    }

    /// Build the snapshot
    pub fn build(self) -> Result<ClusterState> {
        ClusterState::build(self.entries, self.region_loads, self.locality, self.racks)
    }
}

/// Integer-indexed cluster snapshot
///
/// Invariant: every region is on exactly one server, and every derived index
/// (per-server lists, per-host/rack counts, per-group and per-table counts)
/// agrees with `region_to_server` after each public call returns.
#[derive(Debug, Clone)]
pub struct ClusterState {
    servers: Vec<ServerName>,
    hosts: Vec<String>,
    racks: Vec<String>,
    tables: Vec<String>,
    regions: Vec<RegionInfo>,

    server_index: HashMap<ServerName, usize>,
    region_index: HashMap<RegionInfo, usize>,

    server_to_host: Vec<usize>,
    server_to_rack: Vec<usize>,
    host_to_servers: Vec<Vec<usize>>,
    rack_to_servers: Vec<Vec<usize>>,

    region_to_server: Vec<usize>,
    initial_region_to_server: Vec<usize>,
    region_to_table: Vec<usize>,
    region_to_group: Vec<usize>,
    group_members: Vec<Vec<usize>>,

    // Regions hosted per server plus each region's slot in its server list,
    // so removal is a swap_remove.
    regions_per_server: Vec<Vec<usize>>,
    region_slot: Vec<usize>,
    regions_per_host: Vec<usize>,
    regions_per_rack: Vec<usize>,

    // Replica group -> number of members, per placement domain
    groups_per_server: Vec<HashMap<usize, u32>>,
    groups_per_host: Vec<HashMap<usize, u32>>,
    groups_per_rack: Vec<HashMap<usize, u32>>,

    // [table][server] -> regions of that table on that server
    table_regions_per_server: Vec<Vec<u32>>,

    region_loads: Vec<Vec<RegionLoad>>,
    region_locality: Vec<HashMap<usize, f64>>,
    has_region_loads: bool,
    has_locality: bool,
}

impl ClusterState {
    /// Start building a snapshot from a server -> regions mapping
    pub fn builder<'a, I>(server_regions: I) -> ClusterStateBuilder<'a>
    where
        I: IntoIterator<Item = (&'a ServerName, &'a Vec<RegionInfo>)>,
    {
        ClusterStateBuilder {
            entries: server_regions.into_iter().collect(),
            region_loads: None,
            locality: None,
            racks: None,
        }
    }

    /// Build a snapshot
    ///
    /// Servers are indexed in sorted order so the same input always produces
    /// the same indices. Fails if a server or a region appears twice.
    pub fn build<'a, I>(
        server_regions: I,
        region_loads: Option<&RegionLoadHints>,
        locality: Option<&LocalityHints>,
        racks: Option<&dyn RackLookup>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a ServerName, &'a Vec<RegionInfo>)>,
    {
        let mut entries: Vec<(&ServerName, &Vec<RegionInfo>)> =
            server_regions.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        if let Some(pair) = entries.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(BalancerError::DuplicateServer(pair[0].0.to_string()));
        }

        let servers: Vec<ServerName> = entries.iter().map(|(s, _)| (*s).clone()).collect();
        let server_index: HashMap<ServerName, usize> = servers
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();

        // Hosts and racks are indexed in name order
        let hosts: Vec<String> = servers
            .iter()
            .map(|s| s.host.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let rack_names: Vec<String> = servers
            .iter()
            .map(|s| match racks {
                Some(lookup) => lookup.rack(s),
                None => UNKNOWN_RACK.to_string(),
            })
            .collect();
        let racks_sorted: Vec<String> = rack_names
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let host_index: HashMap<&str, usize> = hosts
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect();
        let rack_index: HashMap<&str, usize> = racks_sorted
            .iter()
            .enumerate()
            .map(|(i, r)| (r.as_str(), i))
            .collect();

        let server_to_host: Vec<usize> = servers
            .iter()
            .map(|s| host_index[s.host.as_str()])
            .collect();
        let server_to_rack: Vec<usize> = rack_names
            .iter()
            .map(|r| rack_index[r.as_str()])
            .collect();

        let mut host_to_servers = vec![Vec::new(); hosts.len()];
        let mut rack_to_servers = vec![Vec::new(); racks_sorted.len()];
        for server in 0..servers.len() {
            host_to_servers[server_to_host[server]].push(server);
            rack_to_servers[server_to_rack[server]].push(server);
        }

        // Index regions, tables and replica groups
        let mut regions = Vec::new();
        let mut region_index: HashMap<RegionInfo, usize> = HashMap::new();
        let mut region_to_server: Vec<usize> = Vec::new();
        let mut region_to_table = Vec::new();
        let mut region_to_group = Vec::new();
        let mut tables: Vec<String> = Vec::new();
        let mut table_index: HashMap<String, usize> = HashMap::new();
        let mut group_index: HashMap<RegionInfo, usize> = HashMap::new();
        let mut group_members: Vec<Vec<usize>> = Vec::new();

        for (server, (_, hosted)) in entries.iter().enumerate() {
            for region in hosted.iter() {
                if let Some(&previous) = region_index.get(region) {
                    return Err(BalancerError::DuplicateRegion {
                        region: region.to_string(),
                        first: servers[region_to_server[previous]].to_string(),
                        second: servers[server].to_string(),
                    });
                }

                let idx = regions.len();
                region_index.insert(region.clone(), idx);
                regions.push(region.clone());
                region_to_server.push(server);

                let table = *table_index.entry(region.table.clone()).or_insert_with(|| {
                    tables.push(region.table.clone());
                    tables.len() - 1
                });
                region_to_table.push(table);

                let group = *group_index.entry(region.base()).or_insert_with(|| {
                    group_members.push(Vec::new());
                    group_members.len() - 1
                });
                group_members[group].push(idx);
                region_to_group.push(group);
            }
        }

        let num_servers = servers.len();
        let num_regions = regions.len();

        let mut region_loads_idx = vec![Vec::new(); num_regions];
        let mut has_region_loads = false;
        if let Some(loads) = region_loads {
            for (region, samples) in loads {
                if let Some(&idx) = region_index.get(region) {
                    has_region_loads |= !samples.is_empty();
                    region_loads_idx[idx] = samples.clone();
                }
            }
        }

        let mut region_locality = vec![HashMap::new(); num_regions];
        let mut has_locality = false;
        if let Some(hints) = locality {
            for (region, per_server) in hints {
                let Some(&idx) = region_index.get(region) else {
                    continue;
                };
                for (server, fraction) in per_server {
                    if let Some(&s) = server_index.get(server) {
                        let fraction = if fraction.is_finite() {
                            fraction.clamp(0.0, 1.0)
                        } else {
                            0.0
                        };
                        has_locality |= fraction > 0.0;
                        region_locality[idx].insert(s, fraction);
                    }
                }
            }
        }

        let mut state = Self {
            initial_region_to_server: region_to_server.clone(),
            region_slot: vec![0; num_regions],
            regions_per_server: vec![Vec::new(); num_servers],
            regions_per_host: vec![0; hosts.len()],
            regions_per_rack: vec![0; racks_sorted.len()],
            groups_per_server: vec![HashMap::new(); num_servers],
            groups_per_host: vec![HashMap::new(); hosts.len()],
            groups_per_rack: vec![HashMap::new(); racks_sorted.len()],
            table_regions_per_server: vec![vec![0; num_servers]; tables.len()],
            servers,
            hosts,
            racks: racks_sorted,
            tables,
            regions,
            server_index,
            region_index,
            server_to_host,
            server_to_rack,
            host_to_servers,
            rack_to_servers,
            region_to_server,
            region_to_table,
            region_to_group,
            group_members,
            region_loads: region_loads_idx,
            region_locality,
            has_region_loads,
            has_locality,
        };

        for region in 0..num_regions {
            let server = state.region_to_server[region];
            state.place(region, server);
        }

        debug!(
            servers = state.num_servers(),
            hosts = state.num_hosts(),
            racks = state.num_racks(),
            regions = state.num_regions(),
            tables = state.num_tables(),
            replica_groups = state.num_groups(),
            "Built cluster state"
        );

        Ok(state)
    }

    // ========================================
    // Dimensions
    // ========================================

    pub fn num_servers(&self) -> usize {
        self.servers.len()
    }

    pub fn num_hosts(&self) -> usize {
        self.hosts.len()
    }

    pub fn num_racks(&self) -> usize {
        self.racks.len()
    }

    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    /// Number of replica groups (distinct logical regions)
    pub fn num_groups(&self) -> usize {
        self.group_members.len()
    }

    /// Whether several servers share a host name
    pub fn multi_servers_per_host(&self) -> bool {
        self.hosts.len() < self.servers.len()
    }

    /// Whether any replica group has more than one member
    pub fn has_region_replicas(&self) -> bool {
        self.group_members.iter().any(|m| m.len() > 1)
    }

    /// Size of the largest replica group
    pub fn max_replicas(&self) -> usize {
        self.group_members.iter().map(Vec::len).max().unwrap_or(0)
    }

    // ========================================
    // Identity lookups
    // ========================================

    pub fn server(&self, server: usize) -> &ServerName {
        &self.servers[server]
    }

    pub fn servers(&self) -> &[ServerName] {
        &self.servers
    }

    pub fn region(&self, region: usize) -> &RegionInfo {
        &self.regions[region]
    }

    pub fn host_name(&self, host: usize) -> &str {
        &self.hosts[host]
    }

    pub fn rack_name(&self, rack: usize) -> &str {
        &self.racks[rack]
    }

    pub fn table_name(&self, table: usize) -> &str {
        &self.tables[table]
    }

    pub fn server_index(&self, server: &ServerName) -> Option<usize> {
        self.server_index.get(server).copied()
    }

    pub fn region_index(&self, region: &RegionInfo) -> Option<usize> {
        self.region_index.get(region).copied()
    }

    pub fn table_index(&self, table: &str) -> Option<usize> {
        self.tables.iter().position(|t| t == table)
    }

    // ========================================
    // Topology
    // ========================================

    pub fn host_of_server(&self, server: usize) -> usize {
        self.server_to_host[server]
    }

    pub fn rack_of_server(&self, server: usize) -> usize {
        self.server_to_rack[server]
    }

    pub fn servers_on_host(&self, host: usize) -> &[usize] {
        &self.host_to_servers[host]
    }

    pub fn servers_in_rack(&self, rack: usize) -> &[usize] {
        &self.rack_to_servers[rack]
    }

    // ========================================
    // Assignment
    // ========================================

    pub fn server_of_region(&self, region: usize) -> usize {
        self.region_to_server[region]
    }

    /// Server hosting the region when the snapshot was built
    pub fn initial_server_of_region(&self, region: usize) -> usize {
        self.initial_region_to_server[region]
    }

    /// Current server of every region, indexed by region
    pub fn region_to_server(&self) -> &[usize] {
        &self.region_to_server
    }

    pub fn regions_on_server(&self, server: usize) -> &[usize] {
        &self.regions_per_server[server]
    }

    pub fn region_count(&self, server: usize) -> usize {
        self.regions_per_server[server].len()
    }

    /// Region count of every server, indexed by server
    pub fn region_counts(&self) -> Vec<usize> {
        self.regions_per_server.iter().map(Vec::len).collect()
    }

    pub fn regions_on_host(&self, host: usize) -> usize {
        self.regions_per_host[host]
    }

    pub fn regions_in_rack(&self, rack: usize) -> usize {
        self.regions_per_rack[rack]
    }

    pub fn table_of_region(&self, region: usize) -> usize {
        self.region_to_table[region]
    }

    /// Regions of `table` currently on `server`
    pub fn table_region_count(&self, table: usize, server: usize) -> u32 {
        self.table_regions_per_server[table][server]
    }

    /// Per-server region counts of one table
    pub fn table_region_counts(&self, table: usize) -> &[u32] {
        &self.table_regions_per_server[table]
    }

    // ========================================
    // Replica groups
    // ========================================

    pub fn group_of_region(&self, region: usize) -> usize {
        self.region_to_group[region]
    }

    pub fn group_members(&self, group: usize) -> &[usize] {
        &self.group_members[group]
    }

    pub fn group_size(&self, group: usize) -> usize {
        self.group_members[group].len()
    }

    pub fn group_count_on_server(&self, server: usize, group: usize) -> u32 {
        self.groups_per_server[server].get(&group).copied().unwrap_or(0)
    }

    pub fn group_count_on_host(&self, host: usize, group: usize) -> u32 {
        self.groups_per_host[host].get(&group).copied().unwrap_or(0)
    }

    pub fn group_count_on_rack(&self, rack: usize, group: usize) -> u32 {
        self.groups_per_rack[rack].get(&group).copied().unwrap_or(0)
    }

    /// (group, members) pairs hosted on a server
    pub fn groups_on_server(&self, server: usize) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.groups_per_server[server].iter().map(|(g, c)| (*g, *c))
    }

    pub fn groups_on_host(&self, host: usize) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.groups_per_host[host].iter().map(|(g, c)| (*g, *c))
    }

    pub fn groups_in_rack(&self, rack: usize) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.groups_per_rack[rack].iter().map(|(g, c)| (*g, *c))
    }

    // ========================================
    // Hints
    // ========================================

    pub fn has_region_loads(&self) -> bool {
        self.has_region_loads
    }

    /// Load samples of a region, oldest first
    pub fn region_loads(&self, region: usize) -> &[RegionLoad] {
        &self.region_loads[region]
    }

    pub fn has_locality(&self) -> bool {
        self.has_locality
    }

    /// Locality of a region if it were hosted on `server`
    pub fn locality(&self, region: usize, server: usize) -> f64 {
        self.region_locality[region]
            .get(&server)
            .copied()
            .unwrap_or(0.0)
    }

    /// Best server for a region by locality, if any server has local data
    pub fn best_locality(&self, region: usize) -> Option<(usize, f64)> {
        self.region_locality[region]
            .iter()
            .filter(|(_, f)| **f > 0.0)
            .map(|(s, f)| (*s, *f))
            .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
    }

    // ========================================
    // Mutation
    // ========================================

    /// Check that a move is valid against the current assignment
    pub fn validate_move(&self, mv: &RegionMove) -> Result<()> {
        if mv.region >= self.regions.len() {
            return Err(BalancerError::UnknownRegion(mv.region));
        }
        if mv.from >= self.servers.len() {
            return Err(BalancerError::UnknownServer(mv.from));
        }
        if mv.to >= self.servers.len() {
            return Err(BalancerError::UnknownServer(mv.to));
        }
        if self.region_to_server[mv.region] != mv.from {
            return Err(BalancerError::RegionNotOnServer {
                region: mv.region,
                server: mv.from,
            });
        }
        Ok(())
    }

    /// Check every move of an action before any of them is applied
    pub fn validate(&self, action: &Action) -> Result<()> {
        match *action {
            Action::Null => Ok(()),
            Action::Move { region, from, to } => self.validate_move(&RegionMove::new(region, from, to)),
            Action::Swap {
                from_server,
                from_region,
                to_server,
                to_region,
            } => {
                if from_server == to_server || from_region == to_region {
                    return Err(BalancerError::InvalidAction(format!(
                        "swap of region {} on server {} with region {} on server {}",
                        from_region, from_server, to_region, to_server
                    )));
                }
                self.validate_move(&RegionMove::new(from_region, from_server, to_server))?;
                self.validate_move(&RegionMove::new(to_region, to_server, from_server))
            }
        }
    }

    /// Move a region between servers, updating every derived index
    ///
    /// Fails without touching the snapshot if `region` is not on `from`.
    pub fn move_region(&mut self, region: usize, from: usize, to: usize) -> Result<()> {
        self.validate_move(&RegionMove::new(region, from, to))?;
        if from != to {
            self.unplace(region, from);
            self.place(region, to);
        }
        Ok(())
    }

    /// Apply every move of an action; nothing changes if any move is invalid
    pub fn apply(&mut self, action: &Action) -> Result<()> {
        self.validate(action)?;
        for mv in action.moves() {
            self.unplace(mv.region, mv.from);
            self.place(mv.region, mv.to);
        }
        Ok(())
    }

    /// Move regions so the assignment matches `target` (indexed by region)
    pub fn restore(&mut self, target: &[usize]) -> Result<()> {
        if target.len() != self.regions.len() {
            return Err(BalancerError::InvalidAction(format!(
                "assignment covers {} regions, snapshot has {}",
                target.len(),
                self.regions.len()
            )));
        }
        if let Some(&bad) = target.iter().find(|s| **s >= self.servers.len()) {
            return Err(BalancerError::UnknownServer(bad));
        }
        for (region, &server) in target.iter().enumerate() {
            let current = self.region_to_server[region];
            if current != server {
                self.unplace(region, current);
                self.place(region, server);
            }
        }
        Ok(())
    }

    fn place(&mut self, region: usize, server: usize) {
        let host = self.server_to_host[server];
        let rack = self.server_to_rack[server];
        let group = self.region_to_group[region];
        let table = self.region_to_table[region];

        self.region_to_server[region] = server;
        self.region_slot[region] = self.regions_per_server[server].len();
        self.regions_per_server[server].push(region);
        self.regions_per_host[host] += 1;
        self.regions_per_rack[rack] += 1;

        *self.groups_per_server[server].entry(group).or_insert(0) += 1;
        *self.groups_per_host[host].entry(group).or_insert(0) += 1;
        *self.groups_per_rack[rack].entry(group).or_insert(0) += 1;

        self.table_regions_per_server[table][server] += 1;
    }

    fn unplace(&mut self, region: usize, server: usize) {
        let host = self.server_to_host[server];
        let rack = self.server_to_rack[server];
        let group = self.region_to_group[region];
        let table = self.region_to_table[region];

        let slot = self.region_slot[region];
        let list = &mut self.regions_per_server[server];
        list.swap_remove(slot);
        if let Some(&displaced) = list.get(slot) {
            self.region_slot[displaced] = slot;
        }
        self.regions_per_host[host] -= 1;
        self.regions_per_rack[rack] -= 1;

        decrement(&mut self.groups_per_server[server], group);
        decrement(&mut self.groups_per_host[host], group);
        decrement(&mut self.groups_per_rack[rack], group);

        self.table_regions_per_server[table][server] -= 1;
    }

    // ========================================
    // Export
    // ========================================

    /// Current assignment as server -> regions, regions in input order
    pub fn assignment(&self) -> ServerRegions {
        let mut out = BTreeMap::new();
        for (server, hosted) in self.regions_per_server.iter().enumerate() {
            let mut hosted = hosted.clone();
            hosted.sort_unstable();
            out.insert(
                self.servers[server].clone(),
                hosted.into_iter().map(|r| self.regions[r].clone()).collect(),
            );
        }
        out
    }

    /// Number of regions no longer on their initial server
    pub fn moved_region_count(&self) -> usize {
        self.region_to_server
            .iter()
            .zip(&self.initial_region_to_server)
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Plans taking the initial assignment to the current one
    pub fn region_plans(&self) -> Vec<RegionPlan> {
        (0..self.regions.len())
            .filter(|&r| self.region_to_server[r] != self.initial_region_to_server[r])
            .map(|r| RegionPlan {
                region: self.regions[r].clone(),
                source: self.servers[self.initial_region_to_server[r]].clone(),
                destination: self.servers[self.region_to_server[r]].clone(),
            })
            .collect()
    }
}

fn decrement(counts: &mut HashMap<usize, u32>, group: usize) {
    if let Some(count) = counts.get_mut(&group) {
        *count -= 1;
        if *count == 0 {
            counts.remove(&group);
        }
    }
}
