//! Observable engine state, shared between the reconciliation engine (writer) and the
//! health/status HTTP server (reader), per §4.7.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// The outcome of the most recently completed reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassOutcome {
    /// Every operation in the pass succeeded.
    Clean,
    /// At least one operation failed, but the pass ran to completion.
    Partial,
    /// The pass could not run at all (e.g. no zones resolvable, observer not yet synced).
    Failed,
}

/// The full status object served at `/health` (§4.7).
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    /// Timestamp of the last pass that completed with [`PassOutcome::Clean`]. Only a clean
    /// pass advances this watermark (§4.6 step 8).
    pub last_successful_sync_at: Option<DateTime<Utc>>,
    /// Known zone names, from the most recent zone cache population.
    pub zone_names: Vec<String>,
    /// Number of active hostname specs considered in the last pass.
    pub active_spec_count: usize,
    /// Outcome of the most recently completed pass, if any has completed yet.
    pub last_outcome: Option<PassOutcome>,
    /// True once the cluster observer has completed its first full list.
    pub observer_synced: bool,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            last_successful_sync_at: None,
            zone_names: Vec::new(),
            active_spec_count: 0,
            last_outcome: None,
            observer_synced: false,
        }
    }
}

impl Status {
    /// Liveness: the process is up and able to serve this request at all. Always true once
    /// this struct is reachable; the HTTP layer answers this without even locking.
    pub fn live() -> bool {
        true
    }

    /// Readiness: the initial observer sync has completed AND the zone list is populated
    /// (§4.7).
    pub fn ready(&self) -> bool {
        self.observer_synced && !self.zone_names.is_empty()
    }
}

/// Shared handle to the status object: the engine holds the writer half implicitly through
/// `Arc` clones, the HTTP server holds a read-only view through the same clones.
pub type SharedStatus = Arc<RwLock<Status>>;

/// Construct a fresh, empty shared status handle.
pub fn shared_status() -> SharedStatus {
    Arc::new(RwLock::new(Status::default()))
}
