//! The DNS provider client contract.

use std::net::Ipv4Addr;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::ActualRecord;

/// A typed wrapper over a DNS provider's HTTP API, scoped to A records within one zone at a
/// time.
///
/// Trust level: untrusted. Every call crosses a network boundary to a third party; the
/// engine treats every `Err` as this call having had no effect and every `Ok` as having
/// taken effect exactly once.
///
/// # Retry contract
///
/// Implementations own their own bounded-attempt retry and the retryable/non-retryable
/// classification (HTTP 5xx, 429, and transport errors are retryable; other 4xx are not).
/// By the time a call returns to the engine, retries (if any) are already exhausted — the
/// engine never re-issues a call itself. A failed call after retries is recorded as one
/// failed operation in the current pass; it never aborts the pass.
///
/// `delete_a` MUST treat "record not found" as success: deleting something that's already
/// gone is the expected steady state after a previous delete whose response was lost, and
/// must not be reported as failure (P7).
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every A record in a zone. Pagination, if the provider paginates, is handled
    /// internally — callers always see the complete set.
    async fn list_a(&self, zone_id: &str) -> Result<Vec<ActualRecord>>;

    /// Create an A record. Returns the provider-assigned record id.
    async fn create_a(
        &self,
        zone_id: &str,
        hostname: &str,
        ipv4: Ipv4Addr,
        ttl: u32,
        proxied: bool,
    ) -> Result<String>;

    /// Delete an A record by provider id. A record that no longer exists is success, not an
    /// error (P7).
    async fn delete_a(&self, zone_id: &str, provider_id: &str) -> Result<()>;
}
