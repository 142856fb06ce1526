//! Service Config Registry: merges per-service `HostnameSpec`s into one set, resolving
//! conflicts deterministically (§4.4).

use crate::model::HostnameSpec;

/// The result of projecting raw per-service specs into a merged, conflict-free set.
#[derive(Debug, Clone, Default)]
pub struct RegistryOutcome {
    /// One spec per distinct hostname.
    pub specs: Vec<HostnameSpec>,
    /// Warnings for conflicting peers that were not selected.
    pub diagnostics: Vec<String>,
}

/// Merge raw per-service specs into one spec per hostname.
///
/// Specs that agree on (ttl, proxied) for the same hostname are merged silently. Specs that
/// disagree are a configuration conflict: the peer with the lexicographically lowest
/// `owner` ("namespace/name") wins, and a warning is recorded for every other peer.
pub fn build_registry(raw_specs: Vec<HostnameSpec>) -> RegistryOutcome {
    use std::collections::BTreeMap;

    let mut by_hostname: BTreeMap<String, Vec<HostnameSpec>> = BTreeMap::new();
    for spec in raw_specs {
        by_hostname.entry(spec.hostname.clone()).or_default().push(spec);
    }

    let mut specs = Vec::new();
    let mut diagnostics = Vec::new();

    for (hostname, mut peers) in by_hostname {
        peers.sort_by(|a, b| a.owner.cmp(&b.owner));
        let winner = peers[0].clone();
        for peer in &peers[1..] {
            if peer.attributes() != winner.attributes() {
                diagnostics.push(format!(
                    "hostname {hostname}: conflicting spec from {} (ttl={}, proxied={}) overridden by {} (ttl={}, proxied={})",
                    peer.owner, peer.ttl, peer.proxied, winner.owner, winner.ttl, winner.proxied
                ));
            }
        }
        specs.push(winner);
    }

    RegistryOutcome { specs, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(hostname: &str, ttl: u32, proxied: bool, owner: &str) -> HostnameSpec {
        HostnameSpec {
            hostname: hostname.to_string(),
            ttl,
            proxied,
            owner: owner.to_string(),
        }
    }

    #[test]
    fn identical_specs_merge_silently() {
        let outcome = build_registry(vec![
            spec("api.example.com", 300, false, "ns/a"),
            spec("api.example.com", 300, false, "ns/b"),
        ]);
        assert_eq!(outcome.specs.len(), 1);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn conflicting_specs_pick_lowest_owner_and_warn() {
        let outcome = build_registry(vec![
            spec("api.example.com", 300, false, "ns/zeta"),
            spec("api.example.com", 60, true, "ns/alpha"),
        ]);
        assert_eq!(outcome.specs.len(), 1);
        assert_eq!(outcome.specs[0].owner, "ns/alpha");
        assert_eq!(outcome.specs[0].ttl, 60);
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn distinct_hostnames_all_survive() {
        let outcome = build_registry(vec![
            spec("a.example.com", 300, false, "ns/a"),
            spec("b.example.com", 300, false, "ns/b"),
        ]);
        assert_eq!(outcome.specs.len(), 2);
    }
}
