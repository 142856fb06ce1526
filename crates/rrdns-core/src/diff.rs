//! The desired-vs-actual diff algorithm, scoped to a single zone (§4.6 step 6).

use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::model::{ActualRecord, DesiredRecord};

/// The set of operations needed to converge one zone's actual records toward its desired
/// records.
#[derive(Debug, Clone, Default)]
pub struct ZoneDiff {
    /// Records to create. Includes both genuinely-missing records and the create half of a
    /// `toReplace` pair.
    pub to_create: Vec<DesiredRecord>,
    /// Records to delete. Includes both genuinely-stale records and the delete half of a
    /// `toReplace` pair.
    pub to_delete: Vec<ActualRecord>,
    /// (hostname, ipv4) keys present on both sides with mismatched (ttl, proxied). Each key
    /// here has already contributed one entry to `to_delete` and one to `to_create`; the
    /// apply step enforces delete-before-create specifically for these keys (P5). Keys not
    /// listed here carry no ordering requirement between their create and delete.
    pub replace_keys: Vec<(String, Ipv4Addr)>,
}

/// Diff one zone's actual records against its desired records.
pub fn diff_zone(desired: &[DesiredRecord], actual: &[ActualRecord]) -> ZoneDiff {
    let desired_by_key: HashMap<(String, Ipv4Addr), &DesiredRecord> =
        desired.iter().map(|r| (r.key(), r)).collect();
    let actual_by_key: HashMap<(String, Ipv4Addr), &ActualRecord> =
        actual.iter().map(|r| (r.key(), r)).collect();

    let mut to_create = Vec::new();
    let mut to_delete = Vec::new();
    let mut replace_keys = Vec::new();

    for (key, d) in &desired_by_key {
        match actual_by_key.get(key) {
            None => to_create.push((*d).clone()),
            Some(a) => {
                if a.attributes() != d.attributes() {
                    to_delete.push((*a).clone());
                    to_create.push((*d).clone());
                    replace_keys.push(key.clone());
                }
            }
        }
    }

    for (key, a) in &actual_by_key {
        if !desired_by_key.contains_key(key) {
            to_delete.push((*a).clone());
        }
    }

    ZoneDiff {
        to_create,
        to_delete,
        replace_keys,
    }
}
