//! In-memory fakes for the three capability traits, shared by the integration tests in this
//! crate. No mocking framework — each fake implements the trait directly, with atomic
//! counters and mutex-guarded state where a test needs to observe or drive behavior.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use rrdns_core::error::{Error, Result};
use rrdns_core::model::{ActualRecord, HostnameSpec, Node, Zone};
use rrdns_core::traits::{ClusterObserver, ClusterSnapshot, DnsProvider, ZoneResolver};
use rrdns_core::zone_match::longest_suffix_match;

/// A `ClusterObserver` whose nodes/specs and sync state are set directly by the test, and
/// whose single-slot signal channel can be nudged with [`FakeClusterObserver::notify`].
pub struct FakeClusterObserver {
    nodes: Mutex<HashMap<String, Node>>,
    specs: Mutex<Vec<HostnameSpec>>,
    synced: std::sync::atomic::AtomicBool,
    signal_tx: mpsc::Sender<()>,
    signal_rx: Mutex<Option<mpsc::Receiver<()>>>,
    snapshot_calls: AtomicUsize,
}

impl FakeClusterObserver {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            nodes: Mutex::new(HashMap::new()),
            specs: Mutex::new(Vec::new()),
            synced: std::sync::atomic::AtomicBool::new(true),
            signal_tx: tx,
            signal_rx: Mutex::new(Some(rx)),
            snapshot_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_nodes(&self, nodes: Vec<Node>) {
        *self.nodes.lock().unwrap() = nodes.into_iter().map(|n| (n.name.clone(), n)).collect();
    }

    pub fn set_specs(&self, specs: Vec<HostnameSpec>) {
        *self.specs.lock().unwrap() = specs;
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst);
    }

    /// Coalesced signal: a burst of calls before the receiver drains still yields at most
    /// one pending wake-up, because the channel has capacity 1.
    pub fn notify(&self) {
        let _ = self.signal_tx.try_send(());
    }

    pub fn snapshot_call_count(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterObserver for FakeClusterObserver {
    async fn snapshot(&self) -> ClusterSnapshot {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        ClusterSnapshot {
            nodes: self.nodes.lock().unwrap().clone(),
            specs: self.specs.lock().unwrap().clone(),
        }
    }

    fn subscribe(&self) -> mpsc::Receiver<()> {
        self.signal_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }

    fn initial_sync_complete(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }
}

/// A `ZoneResolver` backed by a fixed zone list, using the real longest-suffix algorithm so
/// zone-routing tests exercise production logic.
pub struct FakeZoneResolver {
    zones: Vec<Zone>,
}

impl FakeZoneResolver {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }
}

#[async_trait]
impl ZoneResolver for FakeZoneResolver {
    async fn resolve(&self, hostname: &str) -> Result<Option<String>> {
        Ok(longest_suffix_match(&self.zones, hostname).map(|z| z.id.clone()))
    }

    async fn zones(&self) -> Result<Vec<Zone>> {
        Ok(self.zones.clone())
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

/// A `DnsProvider` backed by an in-memory per-zone record set, with one-shot failure
/// injection for simulating transient provider errors on a specific operation.
#[derive(Default)]
pub struct FakeDnsProvider {
    records: Mutex<HashMap<String, Vec<ActualRecord>>>,
    next_id: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_deletes_once: Mutex<std::collections::HashSet<String>>,
    fail_creates_once: Mutex<std::collections::HashSet<String>>,
}

impl FakeDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, zone_id: &str, records: Vec<ActualRecord>) {
        self.records.lock().unwrap().insert(zone_id.to_string(), records);
    }

    pub fn records_in(&self, zone_id: &str) -> Vec<ActualRecord> {
        self.records.lock().unwrap().get(zone_id).cloned().unwrap_or_default()
    }

    /// The next `delete_a` call for this provider id fails once, then succeeds on retry.
    pub fn fail_next_delete(&self, provider_id: &str) {
        self.fail_deletes_once.lock().unwrap().insert(provider_id.to_string());
    }

    /// The next `create_a` call for this hostname fails once, then succeeds on retry.
    pub fn fail_next_create(&self, hostname: &str) {
        self.fail_creates_once.lock().unwrap().insert(hostname.to_string());
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DnsProvider for FakeDnsProvider {
    async fn list_a(&self, zone_id: &str) -> Result<Vec<ActualRecord>> {
        Ok(self.records_in(zone_id))
    }

    async fn create_a(
        &self,
        zone_id: &str,
        hostname: &str,
        ipv4: Ipv4Addr,
        ttl: u32,
        proxied: bool,
    ) -> Result<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_creates_once.lock().unwrap().remove(hostname) {
            return Err(Error::provider_transient("simulated create failure"));
        }
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records
            .lock()
            .unwrap()
            .entry(zone_id.to_string())
            .or_default()
            .push(ActualRecord {
                provider_id: id.clone(),
                hostname: hostname.to_string(),
                ipv4,
                ttl,
                proxied,
                zone_id: zone_id.to_string(),
            });
        Ok(id)
    }

    async fn delete_a(&self, zone_id: &str, provider_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes_once.lock().unwrap().remove(provider_id) {
            return Err(Error::provider_transient("simulated delete failure"));
        }
        if let Some(list) = self.records.lock().unwrap().get_mut(zone_id) {
            list.retain(|r| r.provider_id != provider_id);
        }
        Ok(())
    }
}

pub fn node(name: &str, ip: [u8; 4]) -> Node {
    Node::new(name).with_ip(Ipv4Addr::from(ip))
}

pub fn spec(hostname: &str, ttl: u32, proxied: bool, owner: &str) -> HostnameSpec {
    HostnameSpec {
        hostname: hostname.to_string(),
        ttl,
        proxied,
        owner: owner.to_string(),
    }
}

pub fn zone(id: &str, name: &str) -> Zone {
    Zone {
        id: id.to_string(),
        name: name.to_string(),
    }
}
