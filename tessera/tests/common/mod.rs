//! Shared helpers for building mock clusters
#![allow(dead_code)]

use tessera::{RegionInfo, ServerName, ServerRegions};

/// Servers sort in creation order: srv000, srv001, ...
pub fn server(i: usize) -> ServerName {
    ServerName::new(&format!("srv{:03}", i), 16020, 1)
}

/// Distinct primary regions spread over a few tables
pub fn regions(count: usize, first_id: u64) -> Vec<RegionInfo> {
    (0..count as u64)
        .map(|i| {
            let id = first_id + i;
            RegionInfo::new(
                &format!("table{}", id % 3),
                &format!("{:06}", id),
                &format!("{:06}", id + 1),
                id,
            )
        })
        .collect()
}

/// One server per entry, hosting that many distinct regions
pub fn mock_cluster_servers(counts: &[usize]) -> ServerRegions {
    let mut map = ServerRegions::new();
    let mut next_id = 1;
    for (i, &count) in counts.iter().enumerate() {
        map.insert(server(i), regions(count, next_id));
        next_id += count as u64;
    }
    map
}

/// Hosts ending in "1" live on rack1, everything else on rack2
pub fn rack_one(server: &ServerName) -> String {
    if server.host.ends_with('1') {
        "rack1".to_string()
    } else {
        "rack2".to_string()
    }
}

pub fn named(host: &str) -> ServerName {
    ServerName::new(host, 1000, 11111)
}
