//! Desired State Builder: a pure function from (eligible nodes × hostname specs) to the set
//! of DNS A records that should exist (§4.5).

use std::collections::BTreeSet;

use crate::model::{DesiredRecord, HostnameSpec, Node};
use crate::traits::ZoneResolver;

/// A diagnostic recorded when a spec's hostname resolves to no known zone. Does not abort
/// the build; the record is simply omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDiagnostic {
    pub hostname: String,
    pub message: String,
}

/// The result of a desired-state build: the record set plus any diagnostics.
#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
    pub desired: BTreeSet<DesiredRecord>,
    pub diagnostics: Vec<BuildDiagnostic>,
    /// Every zone any enabled spec resolved to, regardless of whether it produced a
    /// `DesiredRecord`. A spec with zero eligible nodes still routes to a zone that must be
    /// reconciled — with an empty desired set — so any stale record there gets deleted.
    pub resolved_zones: BTreeSet<String>,
}

/// Build the desired record set for the current pass.
///
/// `build(eligibleNodes, specs) = { (spec.hostname, node.externalIPv4, spec.ttl,
/// spec.proxied, resolve(spec.hostname)) | node ∈ eligibleNodes, spec ∈ specs,
/// node.externalIPv4 defined }`. A spec whose hostname resolves to no zone contributes
/// nothing and is recorded as a diagnostic rather than aborting the whole build.
pub async fn build_desired_state(
    eligible_nodes: &[Node],
    specs: &[HostnameSpec],
    resolver: &dyn ZoneResolver,
) -> BuildOutcome {
    let mut desired = BTreeSet::new();
    let mut diagnostics = Vec::new();
    let mut resolved_zones = BTreeSet::new();

    for spec in specs {
        let zone_id = match resolver.resolve(&spec.hostname).await {
            Ok(Some(zone_id)) => zone_id,
            Ok(None) => {
                diagnostics.push(BuildDiagnostic {
                    hostname: spec.hostname.clone(),
                    message: "no zone matches this hostname".to_string(),
                });
                continue;
            }
            Err(err) => {
                diagnostics.push(BuildDiagnostic {
                    hostname: spec.hostname.clone(),
                    message: format!("zone resolution failed: {err}"),
                });
                continue;
            }
        };

        resolved_zones.insert(zone_id.clone());

        for node in eligible_nodes {
            let Some(ipv4) = node.external_ipv4 else {
                continue;
            };
            desired.insert(DesiredRecord {
                hostname: spec.hostname.clone(),
                ipv4,
                ttl: spec.ttl,
                proxied: spec.proxied,
                zone_id: zone_id.clone(),
            });
        }
    }

    BuildOutcome {
        desired,
        diagnostics,
        resolved_zones,
    }
}
