//! Zone directory and hostname→zone resolution.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Zone;

/// Resolves a hostname to the DNS zone that owns it, and exposes the zone directory itself.
///
/// Trust level: semi-trusted. Implementations talk to an external DNS provider and may
/// return stale data between refreshes; they must never silently invent a zone id that
/// wasn't actually returned by the provider.
///
/// # Resolution rule
///
/// `resolve("api.example.com")` must return the zone whose name is the *longest* DNS suffix
/// of the hostname. `"example.com"` is a suffix of `"api.example.com"`; `"api.example.com"`
/// is *not* a suffix of `"api.other.com"`. On a cache miss the resolver refreshes its zone
/// list once and retries; a second miss is a real `NoMatch`, not a transient error.
#[async_trait]
pub trait ZoneResolver: Send + Sync {
    /// Resolve a hostname to the id of the zone that owns it, by longest-suffix match.
    /// Returns `Ok(None)` on a confirmed miss (after one refresh-and-retry), not an error.
    async fn resolve(&self, hostname: &str) -> Result<Option<String>>;

    /// The cached zone list, refreshed lazily on a resolve miss or explicitly via
    /// [`ZoneResolver::refresh`].
    async fn zones(&self) -> Result<Vec<Zone>>;

    /// Force a zone-list refresh. Concurrent refreshes must collapse into one underlying
    /// fetch (single-flight): callers should never observe more than one in-flight refresh
    /// at a time.
    async fn refresh(&self) -> Result<()>;
}
