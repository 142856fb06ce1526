//! The longest-suffix hostname→zone matching rule shared by every `ZoneResolver`
//! implementation (§4.1). Kept as one small, independently-tested function since this is
//! "the one place a subtle correctness bug (prefix vs proper-suffix match, trailing-dot
//! normalization) is likely" (§9).

use crate::model::Zone;

/// Returns the zone whose name is the longest DNS suffix of `hostname`, or `None` if no
/// zone matches.
///
/// `"example.com"` is a suffix of `"api.example.com"`; it is NOT a suffix of
/// `"apiexample.com"` — suffix matching is label-aware (a dot boundary, or an exact match),
/// never a bare string suffix. Ties (same length) are broken lexicographically; this can
/// only happen if the zone list itself contains two zones with the same name, which a real
/// DNS provider never returns.
pub fn longest_suffix_match<'a>(zones: &'a [Zone], hostname: &str) -> Option<&'a Zone> {
    let mut matches: Vec<&Zone> = zones.iter().filter(|z| is_dns_suffix(hostname, &z.name)).collect();
    matches.sort_by(|a, b| a.name.len().cmp(&b.name.len()).then_with(|| a.name.cmp(&b.name)));
    matches.pop()
}

fn is_dns_suffix(hostname: &str, zone_name: &str) -> bool {
    hostname == zone_name || hostname.ends_with(&format!(".{zone_name}"))
}
