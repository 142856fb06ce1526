//! The Reconciliation Engine: the single task that owns convergence (§4.6).
//!
//! State machine: `Idle → Running → Publishing → Idle`. A trigger arriving while the engine
//! is `Running` sets a pending flag rather than starting a second pass — passes are strictly
//! serialized (§5) — and the engine rechecks that flag immediately on returning to `Idle`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::builder::build_desired_state;
use crate::diff::diff_zone;
use crate::error::Result;
use crate::model::DesiredRecord;
use crate::registry::build_registry;
use crate::status::{PassOutcome, SharedStatus};
use crate::traits::{ClusterObserver, DnsProvider, ZoneResolver};

/// Tuning for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Periodic full-sync interval (§4.6 trigger 1). `DNS_SYNC_INTERVAL`.
    pub sync_interval: Duration,
    /// Minimum gap enforced between the start of consecutive passes, even when triggers
    /// arrive back-to-back. Default 0 (no minimum).
    pub min_pass_interval: Duration,
    /// Bound on concurrent per-zone fetch/apply work within one pass (§5: "≤4").
    pub zone_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(60),
            min_pass_interval: Duration::ZERO,
            zone_concurrency: 4,
        }
    }
}

/// Internal events the engine emits for observability and for test assertions. Not part of
/// the public HTTP surface — that's [`crate::status::Status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PassStarted,
    PassCompleted {
        outcome: PassOutcome,
        creates: usize,
        deletes: usize,
        failures: usize,
    },
}

/// Orchestrates reconciliation: triggers, snapshotting, building, diffing, applying, and
/// status publication.
pub struct ReconciliationEngine {
    resolver: Arc<dyn ZoneResolver>,
    provider: Arc<dyn DnsProvider>,
    observer: Arc<dyn ClusterObserver>,
    config: EngineConfig,
    status: SharedStatus,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ReconciliationEngine {
    /// Construct an engine from its three injected collaborators. Returns a receiver of
    /// internal [`EngineEvent`]s for tests and diagnostics to observe pass boundaries.
    pub fn new(
        resolver: Arc<dyn ZoneResolver>,
        provider: Arc<dyn DnsProvider>,
        observer: Arc<dyn ClusterObserver>,
        config: EngineConfig,
        status: SharedStatus,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            Self {
                resolver,
                provider,
                observer,
                config,
                status,
                event_tx,
            },
            event_rx,
        )
    }

    /// Run the reconciliation loop until the process is cancelled externally (e.g. the
    /// surrounding task is aborted).
    pub async fn run(self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the reconciliation loop until `shutdown` resolves. Exposed for integration tests
    /// that need deterministic termination; production code uses [`Self::run`] and relies on
    /// the daemon's task supervisor for cancellation.
    pub async fn run_with_shutdown(self, shutdown: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.run_internal(shutdown).await
    }

    async fn run_internal(self, mut shutdown: Option<oneshot::Receiver<()>>) -> Result<()> {
        let mut signal_rx = self.observer.subscribe();
        let mut timer = tokio::time::interval(self.config.sync_interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        timer.tick().await; // the first tick fires immediately; we drive startup explicitly below

        let mut pending = true; // trigger 3: startup runs immediately
        let mut last_pass_start: Option<Instant> = None;

        loop {
            if !pending {
                tokio::select! {
                    _ = timer.tick() => {
                        debug!("periodic sync timer fired");
                        pending = true;
                    }
                    signal = signal_rx.recv() => {
                        if signal.is_some() {
                            debug!("cluster observer signal received");
                            pending = true;
                        }
                        // a closed signal channel just means the observer will never notify
                        // again; the periodic timer remains the fallback trigger.
                    }
                    _ = wait_shutdown(&mut shutdown) => {
                        info!("shutdown signal received while idle");
                        return Ok(());
                    }
                }
            }
            if !pending {
                continue;
            }

            if shutdown_already_fired(&mut shutdown) {
                info!("shutdown signal received before starting pass");
                return Ok(());
            }

            if let Some(last) = last_pass_start {
                let elapsed = last.elapsed();
                if elapsed < self.config.min_pass_interval {
                    tokio::time::sleep(self.config.min_pass_interval - elapsed).await;
                }
            }

            pending = false;
            last_pass_start = Some(Instant::now());
            // drain any further coalesced signals that arrived while we were about to
            // start: they describe state already covered by the snapshot we're about to
            // take, so they must not also queue up a redundant extra pass (P6).
            while signal_rx.try_recv().is_ok() {}

            let _ = self.event_tx.send(EngineEvent::PassStarted);
            let (outcome, creates, deletes, failures) = self.run_pass().await;
            let _ = self.event_tx.send(EngineEvent::PassCompleted {
                outcome,
                creates,
                deletes,
                failures,
            });
        }
    }

    /// Execute one reconciliation pass end-to-end and publish its result to shared status.
    async fn run_pass(&self) -> (PassOutcome, usize, usize, usize) {
        if !self.observer.initial_sync_complete() {
            warn!("skipping pass: cluster observer has not completed its initial sync");
            self.publish(PassOutcome::Failed, &[], 0).await;
            return (PassOutcome::Failed, 0, 0, 0);
        }

        let snapshot = self.observer.snapshot().await;
        let eligible_nodes: Vec<_> = snapshot
            .nodes
            .values()
            .filter(|n| n.is_eligible())
            .cloned()
            .collect();

        let registry = build_registry(snapshot.specs);
        for warning in &registry.diagnostics {
            warn!(%warning, "service config registry conflict");
        }
        let specs = registry.specs;

        let build = build_desired_state(&eligible_nodes, &specs, &*self.resolver).await;
        for diagnostic in &build.diagnostics {
            warn!(hostname = %diagnostic.hostname, message = %diagnostic.message, "desired-state build diagnostic");
        }

        let known_hostnames: std::collections::HashSet<&str> =
            specs.iter().map(|s| s.hostname.as_str()).collect();

        let mut by_zone: HashMap<String, Vec<DesiredRecord>> = HashMap::new();
        for record in build.desired {
            by_zone.entry(record.zone_id.clone()).or_default().push(record);
        }

        // Every zone any enabled spec resolved to must be reconciled, not just the ones that
        // ended up with a desired record: a hostname with zero eligible nodes still routes to
        // a zone, and a stale ActualRecord there is only deleted if that zone is visited with
        // an empty desired set.
        let mut zones: std::collections::HashSet<String> = build.resolved_zones;
        zones.extend(by_zone.keys().cloned());
        let zones: Vec<String> = zones.into_iter().collect();
        let concurrency = self.config.zone_concurrency.max(1);

        let results: Vec<ZonePassResult> = stream::iter(zones.into_iter())
            .map(|zone_id| {
                let desired = by_zone.remove(&zone_id).unwrap_or_default();
                let known_hostnames = &known_hostnames;
                async move { self.reconcile_zone(&zone_id, desired, known_hostnames).await }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut total_creates = 0usize;
        let mut total_deletes = 0usize;
        let mut total_failures = 0usize;
        for r in &results {
            total_creates += r.creates_ok;
            total_deletes += r.deletes_ok;
            total_failures += r.creates_failed + r.deletes_failed;
        }

        let outcome = if total_failures > 0 {
            PassOutcome::Partial
        } else {
            PassOutcome::Clean
        };

        let zone_names = self
            .resolver
            .zones()
            .await
            .map(|zs| zs.into_iter().map(|z| z.name).collect())
            .unwrap_or_default();
        self.publish(outcome, &zone_names, specs.len()).await;

        (outcome, total_creates, total_deletes, total_failures)
    }

    /// Fetch actual state for one zone, diff it against the desired records routed to that
    /// zone, and apply the delta: deletes first, then creates (§4.6 step 7, P5).
    async fn reconcile_zone(
        &self,
        zone_id: &str,
        desired: Vec<DesiredRecord>,
        known_hostnames: &std::collections::HashSet<&str>,
    ) -> ZonePassResult {
        let actual = match self.provider.list_a(zone_id).await {
            Ok(records) => records
                .into_iter()
                .filter(|r| known_hostnames.contains(r.hostname.as_str()))
                .collect::<Vec<_>>(),
            Err(err) => {
                warn!(zone_id, error = %err, "failed to list actual records for zone");
                return ZonePassResult {
                    creates_ok: 0,
                    creates_failed: desired.len(),
                    deletes_ok: 0,
                    deletes_failed: 0,
                };
            }
        };

        let diff = diff_zone(&desired, &actual);
        let op_concurrency = self.config.zone_concurrency.max(1);

        // Deletes first: this also covers the delete half of every replace pair, so by the
        // time any create below is issued, every delete this pass intends to make has
        // already completed (P5), without needing to track individual pairs.
        let delete_results: Vec<bool> = stream::iter(diff.to_delete.iter())
            .map(|record| async move {
                match self.provider.delete_a(zone_id, &record.provider_id).await {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(zone_id, provider_id = %record.provider_id, error = %err, "delete failed");
                        false
                    }
                }
            })
            .buffer_unordered(op_concurrency)
            .collect()
            .await;

        let create_results: Vec<bool> = stream::iter(diff.to_create.iter())
            .map(|record| async move {
                match self
                    .provider
                    .create_a(zone_id, &record.hostname, record.ipv4, record.ttl, record.proxied)
                    .await
                {
                    Ok(_id) => true,
                    Err(err) => {
                        warn!(zone_id, hostname = %record.hostname, error = %err, "create failed");
                        false
                    }
                }
            })
            .buffer_unordered(op_concurrency)
            .collect()
            .await;

        ZonePassResult {
            creates_ok: create_results.iter().filter(|ok| **ok).count(),
            creates_failed: create_results.iter().filter(|ok| !**ok).count(),
            deletes_ok: delete_results.iter().filter(|ok| **ok).count(),
            deletes_failed: delete_results.iter().filter(|ok| !**ok).count(),
        }
    }

    async fn publish(&self, outcome: PassOutcome, zone_names: &[String], spec_count: usize) {
        let mut status = self.status.write().await;
        status.last_outcome = Some(outcome);
        status.active_spec_count = spec_count;
        status.observer_synced = self.observer.initial_sync_complete();
        if !zone_names.is_empty() {
            status.zone_names = zone_names.to_vec();
        }
        if outcome == PassOutcome::Clean {
            status.last_successful_sync_at = Some(chrono::Utc::now());
        }
    }
}

struct ZonePassResult {
    creates_ok: usize,
    creates_failed: usize,
    deletes_ok: usize,
    deletes_failed: usize,
}

async fn wait_shutdown(rx: &mut Option<oneshot::Receiver<()>>) {
    match rx {
        Some(r) => {
            let _ = r.await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn shutdown_already_fired(rx: &mut Option<oneshot::Receiver<()>>) -> bool {
    match rx {
        Some(r) => matches!(r.try_recv(), Ok(())),
        None => false,
    }
}
