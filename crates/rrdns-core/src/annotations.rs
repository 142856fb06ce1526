//! Parsing of the `epictetus.io/*` service annotations into a [`HostnameSpec`].
//!
//! This is pure, orchestrator-agnostic logic: it takes a map of annotation key/value pairs
//! and an owner identifier and returns either a validated spec or nothing, plus any
//! diagnostics worth logging. Unparseable fields never abort parsing — they fall back to
//! their default with a warning (§4.3, §9: "unparseable fields fall back to defaults with
//! warnings, never raise").

use std::collections::BTreeMap;

use crate::model::HostnameSpec;

/// Annotation key requiring a truthy boolean to enable DNS management for a service.
pub const ANNOTATION_DNS_ENABLED: &str = "epictetus.io/dns-enabled";
/// Annotation key carrying the FQDN to manage.
pub const ANNOTATION_HOSTNAME: &str = "epictetus.io/hostname";
/// Annotation key carrying the TTL in seconds.
pub const ANNOTATION_TTL: &str = "epictetus.io/ttl";
/// Annotation key carrying the proxied flag.
pub const ANNOTATION_PROXIED: &str = "epictetus.io/proxied";

/// A non-fatal condition encountered while parsing one service's annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub owner: String,
    pub message: String,
}

/// Parse one service's annotations into a [`HostnameSpec`], if DNS management is enabled
/// for it.
///
/// Returns `(None, diagnostics)` when `dns-enabled` is absent or not truthy — this is not a
/// diagnostic-worthy condition, just "this service opts out." Returns `(None, diagnostics)`
/// with a warning when enabled but `hostname` is missing or empty, since that is a
/// misconfiguration worth surfacing.
pub fn parse_service_annotations(
    owner: &str,
    annotations: &BTreeMap<String, String>,
) -> (Option<HostnameSpec>, Vec<ParseDiagnostic>) {
    let mut diagnostics = Vec::new();

    let enabled = annotations
        .get(ANNOTATION_DNS_ENABLED)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if !enabled {
        return (None, diagnostics);
    }

    let hostname = match annotations.get(ANNOTATION_HOSTNAME) {
        Some(raw) => normalize_hostname(raw),
        None => {
            diagnostics.push(ParseDiagnostic {
                owner: owner.to_string(),
                message: format!(
                    "{ANNOTATION_DNS_ENABLED} is true but {ANNOTATION_HOSTNAME} is missing"
                ),
            });
            return (None, diagnostics);
        }
    };
    if hostname.is_empty() {
        diagnostics.push(ParseDiagnostic {
            owner: owner.to_string(),
            message: format!("{ANNOTATION_HOSTNAME} is empty after normalization"),
        });
        return (None, diagnostics);
    }

    let ttl = match annotations.get(ANNOTATION_TTL) {
        None => HostnameSpec::DEFAULT_TTL,
        Some(raw) => match raw.parse::<u32>() {
            Ok(v) if v >= 1 && (v as u64) < (1u64 << 31) => v,
            _ => {
                diagnostics.push(ParseDiagnostic {
                    owner: owner.to_string(),
                    message: format!(
                        "{ANNOTATION_TTL} value '{raw}' is not valid; using default {}",
                        HostnameSpec::DEFAULT_TTL
                    ),
                });
                HostnameSpec::DEFAULT_TTL
            }
        },
    };

    let proxied = match annotations.get(ANNOTATION_PROXIED) {
        None => false,
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => {
                diagnostics.push(ParseDiagnostic {
                    owner: owner.to_string(),
                    message: format!("{ANNOTATION_PROXIED} value '{raw}' is not valid; using default false"),
                });
                false
            }
        },
    };

    (
        Some(HostnameSpec {
            hostname,
            ttl,
            proxied,
            owner: owner.to_string(),
        }),
        diagnostics,
    )
}

/// Lowercase and strip a single trailing dot, per the FQDN normalization rule in §3.
fn normalize_hostname(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('.');
    trimmed.to_lowercase()
}
