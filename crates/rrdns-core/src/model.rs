//! Domain types shared by every component: the things being observed (`Node`), the things
//! being configured (`HostnameSpec`), and the things being reconciled (`DesiredRecord`,
//! `ActualRecord`) against a `Zone`.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// A taint that, together with [`TAINT_TO_BE_DELETED`], disqualifies an otherwise-eligible
/// node. Presence of this taint alone does not disqualify a node.
pub const TAINT_DELETION_CANDIDATE: &str = "DeletionCandidateOfClusterAutoscaler";

/// A taint that, together with [`TAINT_DELETION_CANDIDATE`], disqualifies an otherwise-eligible
/// node. Presence of this taint alone does not disqualify a node.
pub const TAINT_TO_BE_DELETED: &str = "ToBeDeletedByClusterAutoscaler";

/// A worker node as observed by the cluster observer.
///
/// Created on first observation, updated on any change, removed on delete. `name` is the
/// cluster-assigned node name and is unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub external_ipv4: Option<Ipv4Addr>,
    pub taints: BTreeSet<String>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            external_ipv4: None,
            taints: BTreeSet::new(),
        }
    }

    pub fn with_ip(mut self, ip: Ipv4Addr) -> Self {
        self.external_ipv4 = Some(ip);
        self
    }

    pub fn with_taint(mut self, taint: impl Into<String>) -> Self {
        self.taints.insert(taint.into());
        self
    }

    /// A node is eligible iff it has an external IPv4 address and is not simultaneously
    /// marked with both autoscaler deletion taints. Presence of only one taint does not
    /// disqualify it (P1).
    pub fn is_eligible(&self) -> bool {
        let scale_down_confirmed = self.taints.contains(TAINT_DELETION_CANDIDATE)
            && self.taints.contains(TAINT_TO_BE_DELETED);
        self.external_ipv4.is_some() && !scale_down_confirmed
    }
}

/// The validated, controller-internal form of a service's DNS annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnameSpec {
    /// Lowercased, trailing-dot-trimmed FQDN.
    pub hostname: String,
    /// TTL in seconds, always positive.
    pub ttl: u32,
    /// Whether the record should be proxied (provider-specific meaning, e.g. Cloudflare
    /// orange-cloud proxying).
    pub proxied: bool,
    /// `namespace/name` of the service that declared this spec.
    pub owner: String,
}

impl HostnameSpec {
    pub const DEFAULT_TTL: u32 = 300;

    /// The (ttl, proxied) pair used to detect configuration conflicts between two specs for
    /// the same hostname.
    pub fn attributes(&self) -> (u32, bool) {
        (self.ttl, self.proxied)
    }
}

/// A DNS zone as seen by the provider: an opaque id and the zone apex name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

/// A record the controller believes should exist, derived from (eligible nodes × specs).
///
/// Keyed by (hostname, ipv4) — that pair is the identity of a DNS-A-record-of-interest
/// within this controller's scope; `ttl`/`proxied` are attributes, not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DesiredRecord {
    pub hostname: String,
    pub ipv4: Ipv4Addr,
    pub ttl: u32,
    pub proxied: bool,
    pub zone_id: String,
}

impl DesiredRecord {
    pub fn key(&self) -> (String, Ipv4Addr) {
        (self.hostname.clone(), self.ipv4)
    }

    pub fn attributes(&self) -> (u32, bool) {
        (self.ttl, self.proxied)
    }
}

/// A record the provider reports as actually existing, restricted to hostnames the
/// controller owns (matches some known `HostnameSpec`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ActualRecord {
    pub provider_id: String,
    pub hostname: String,
    pub ipv4: Ipv4Addr,
    pub ttl: u32,
    pub proxied: bool,
    pub zone_id: String,
}

impl ActualRecord {
    pub fn key(&self) -> (String, Ipv4Addr) {
        (self.hostname.clone(), self.ipv4)
    }

    pub fn attributes(&self) -> (u32, bool) {
        (self.ttl, self.proxied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_without_ip_is_ineligible() {
        let n = Node::new("n1");
        assert!(!n.is_eligible());
    }

    #[test]
    fn node_with_ip_and_no_taints_is_eligible() {
        let n = Node::new("n1").with_ip(Ipv4Addr::new(1, 2, 3, 4));
        assert!(n.is_eligible());
    }

    #[test]
    fn node_with_only_deletion_candidate_taint_stays_eligible() {
        let n = Node::new("n1")
            .with_ip(Ipv4Addr::new(1, 2, 3, 4))
            .with_taint(TAINT_DELETION_CANDIDATE);
        assert!(n.is_eligible());
    }

    #[test]
    fn node_with_only_to_be_deleted_taint_stays_eligible() {
        let n = Node::new("n1")
            .with_ip(Ipv4Addr::new(1, 2, 3, 4))
            .with_taint(TAINT_TO_BE_DELETED);
        assert!(n.is_eligible());
    }

    #[test]
    fn node_with_both_taints_is_ineligible() {
        let n = Node::new("n1")
            .with_ip(Ipv4Addr::new(1, 2, 3, 4))
            .with_taint(TAINT_DELETION_CANDIDATE)
            .with_taint(TAINT_TO_BE_DELETED);
        assert!(!n.is_eligible());
    }
}
