//! The cluster observer contract: a live view of nodes and DNS-enabled services.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::model::{HostnameSpec, Node};

/// An atomic snapshot of cluster state, taken at a single point in time.
///
/// The engine takes exactly one of these at the start of each pass (§5: "Observer snapshots
/// are taken atomically at the start of a pass; a mid-pass event affects the next pass,
/// never the current one").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSnapshot {
    pub nodes: HashMap<String, Node>,
    pub specs: Vec<HostnameSpec>,
}

/// Maintains a live view of cluster nodes and DNS-enabled services.
///
/// Trust level: semi-trusted. The observer is the sole writer of cluster state (§3
/// Ownership); everyone else — the registry, the builder, the engine — reads immutable
/// snapshots. Implementations are responsible for the initial-list-then-watch discipline:
/// on startup and on every reconnection, perform a full list and replace the snapshot
/// atomically before resuming the event stream, so that a watch gap never produces a
/// partial or inconsistent snapshot.
#[async_trait]
pub trait ClusterObserver: Send + Sync {
    /// Take an atomic snapshot of the current node and service-derived spec state.
    async fn snapshot(&self) -> ClusterSnapshot;

    /// Subscribe to change notifications.
    ///
    /// The returned channel has capacity 1: any incoming cluster change is coalesced into at
    /// most one pending wake-up, satisfying the "burst of K events yields at most one extra
    /// pass" requirement (P6) without the observer needing to know anything about
    /// reconciliation passes. Callers should treat receipt of a value as "something changed,
    /// re-snapshot," not as carrying any payload worth inspecting.
    ///
    /// May only be called once per observer instance; the engine is the sole subscriber.
    fn subscribe(&self) -> mpsc::Receiver<()>;

    /// True once the observer has completed its first full list of nodes and services.
    /// Used by the health/status publisher to compute readiness (§4.7).
    fn initial_sync_complete(&self) -> bool;
}
