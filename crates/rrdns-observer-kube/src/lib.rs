//! The Kubernetes [`ClusterObserver`]: watches Nodes and Services, projects them into the
//! core domain types, and emits a coalesced wake-up on every change (§4.3).
//!
//! Two independent watch tasks run for the lifetime of the observer, one per resource kind,
//! each following the initial-list-then-watch discipline `kube::runtime::watcher` provides
//! natively: an `Init`/`InitApply`/`InitDone` sequence on startup and after every
//! reconnection, followed by incremental `Apply`/`Delete` events. Neither task ever holds a
//! lock across an await point; each swaps in a freshly built map under a short-lived write
//! guard.

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Node as K8sNode, Service as K8sService};
use kube::runtime::watcher::{self, Event};
use kube::{Api, Client, ResourceExt};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use rrdns_core::annotations::parse_service_annotations;
use rrdns_core::model::{HostnameSpec, Node};
use rrdns_core::traits::{ClusterObserver, ClusterSnapshot};

/// Build this crate's [`Node`] from a watched Kubernetes Node, grounded on the
/// address-extraction idiom of a `TryFrom<Node>` conversion: take the `ExternalIP` entry from
/// `status.addresses`, and the node's taint keys from `spec.taints`.
fn project_node(node: &K8sNode) -> Node {
    let name = node.name_any();
    let external_ipv4 = node
        .status
        .as_ref()
        .and_then(|s| s.addresses.as_ref())
        .and_then(|addrs| addrs.iter().find(|a| a.type_ == "ExternalIP"))
        .and_then(|a| a.address.parse::<Ipv4Addr>().ok());

    let mut projected = Node::new(name);
    if let Some(ip) = external_ipv4 {
        projected = projected.with_ip(ip);
    }
    if let Some(taints) = node.spec.as_ref().and_then(|s| s.taints.as_ref()) {
        for taint in taints {
            projected = projected.with_taint(taint.key.clone());
        }
    }
    projected
}

/// Project a watched Service into a [`HostnameSpec`], if its annotations enable DNS
/// management. Diagnostics from parsing are logged here, not dropped.
fn project_service(service: &K8sService) -> Option<HostnameSpec> {
    let owner = format!(
        "{}/{}",
        service.namespace().unwrap_or_default(),
        service.name_any()
    );
    let empty = BTreeMap::new();
    let annotations = service.metadata.annotations.as_ref().unwrap_or(&empty);
    let (spec, diagnostics) = parse_service_annotations(&owner, annotations);
    for diagnostic in diagnostics {
        warn!(owner = %diagnostic.owner, message = %diagnostic.message, "service annotation diagnostic");
    }
    spec
}

struct Shared {
    nodes: RwLock<HashMap<String, Node>>,
    specs: RwLock<Vec<HostnameSpec>>,
    nodes_synced: AtomicBool,
    services_synced: AtomicBool,
}

/// Watches Kubernetes Nodes and Services and exposes them as a [`ClusterObserver`].
pub struct KubeClusterObserver {
    shared: Arc<Shared>,
    signal_rx: std::sync::Mutex<Option<mpsc::Receiver<()>>>,
}

impl KubeClusterObserver {
    /// Construct the observer and spawn its two watch tasks. `client` is a fully configured
    /// `kube::Client` (in-cluster or from a kubeconfig, per `K8S_CONFIG_PATH`); building it is
    /// the caller's responsibility so this crate stays agnostic to the config source.
    pub fn new(client: Client) -> Self {
        let shared = Arc::new(Shared {
            nodes: RwLock::new(HashMap::new()),
            specs: RwLock::new(Vec::new()),
            nodes_synced: AtomicBool::new(false),
            services_synced: AtomicBool::new(false),
        });
        let (signal_tx, signal_rx) = mpsc::channel(1);

        tokio::spawn(watch_nodes(client.clone(), shared.clone(), signal_tx.clone()));
        tokio::spawn(watch_services(client, shared.clone(), signal_tx));

        Self {
            shared,
            signal_rx: std::sync::Mutex::new(Some(signal_rx)),
        }
    }
}

#[async_trait]
impl ClusterObserver for KubeClusterObserver {
    async fn snapshot(&self) -> ClusterSnapshot {
        ClusterSnapshot {
            nodes: self.shared.nodes.read().await.clone(),
            specs: self.shared.specs.read().await.clone(),
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
        self.shared.nodes_synced.load(Ordering::SeqCst)
            && self.shared.services_synced.load(Ordering::SeqCst)
    }
}

/// Drive the Node watch: relist-and-rewatch on any disconnect, atomically replace the node
/// map on every `InitDone`, and apply incremental updates as they arrive (§4.3).
async fn watch_nodes(client: Client, shared: Arc<Shared>, signal_tx: mpsc::Sender<()>) {
    let api: Api<K8sNode> = Api::all(client);
    let mut stream = watcher::watcher(api, watcher::Config::default()).boxed();
    let mut staging: HashMap<String, Node> = HashMap::new();

    loop {
        match stream.next().await {
            Some(Ok(Event::Init)) => {
                staging.clear();
            }
            Some(Ok(Event::InitApply(node))) => {
                let projected = project_node(&node);
                staging.insert(projected.name.clone(), projected);
            }
            Some(Ok(Event::InitDone)) => {
                let count = staging.len();
                *shared.nodes.write().await = std::mem::take(&mut staging);
                shared.nodes_synced.store(true, Ordering::SeqCst);
                info!(node_count = count, "initial node list complete");
                let _ = signal_tx.try_send(());
            }
            Some(Ok(Event::Apply(node))) => {
                let projected = project_node(&node);
                shared
                    .nodes
                    .write()
                    .await
                    .insert(projected.name.clone(), projected);
                let _ = signal_tx.try_send(());
            }
            Some(Ok(Event::Delete(node))) => {
                let name = node.name_any();
                shared.nodes.write().await.remove(&name);
                let _ = signal_tx.try_send(());
            }
            Some(Err(err)) => {
                warn!(error = %err, "node watch disconnected; relisting");
                shared.nodes_synced.store(false, Ordering::SeqCst);
            }
            None => {
                debug!("node watch stream ended unexpectedly");
                break;
            }
        }
    }
}

/// Drive the Service watch, identical discipline to [`watch_nodes`] but projecting into
/// `HostnameSpec`s instead of `Node`s.
async fn watch_services(client: Client, shared: Arc<Shared>, signal_tx: mpsc::Sender<()>) {
    let api: Api<K8sService> = Api::all(client);
    let mut stream = watcher::watcher(api, watcher::Config::default()).boxed();
    let mut staging: Vec<HostnameSpec> = Vec::new();

    loop {
        match stream.next().await {
            Some(Ok(Event::Init)) => {
                staging.clear();
            }
            Some(Ok(Event::InitApply(service))) => {
                if let Some(spec) = project_service(&service) {
                    staging.push(spec);
                }
            }
            Some(Ok(Event::InitDone)) => {
                let count = staging.len();
                *shared.specs.write().await = std::mem::take(&mut staging);
                shared.services_synced.store(true, Ordering::SeqCst);
                info!(spec_count = count, "initial service list complete");
                let _ = signal_tx.try_send(());
            }
            Some(Ok(Event::Apply(service))) => {
                let owner = format!(
                    "{}/{}",
                    service.namespace().unwrap_or_default(),
                    service.name_any()
                );
                let mut specs = shared.specs.write().await;
                specs.retain(|s| s.owner != owner);
                if let Some(spec) = project_service(&service) {
                    specs.push(spec);
                }
                drop(specs);
                let _ = signal_tx.try_send(());
            }
            Some(Ok(Event::Delete(service))) => {
                let owner = format!(
                    "{}/{}",
                    service.namespace().unwrap_or_default(),
                    service.name_any()
                );
                shared.specs.write().await.retain(|s| s.owner != owner);
                let _ = signal_tx.try_send(());
            }
            Some(Err(err)) => {
                warn!(error = %err, "service watch disconnected; relisting");
                shared.services_synced.store(false, Ordering::SeqCst);
            }
            None => {
                debug!("service watch stream ended unexpectedly");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{NodeAddress, NodeSpec, NodeStatus, Taint};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn k8s_node(name: &str, ip: Option<&str>, taints: Vec<&str>) -> K8sNode {
        K8sNode {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: Some(NodeSpec {
                taints: if taints.is_empty() {
                    None
                } else {
                    Some(
                        taints
                            .into_iter()
                            .map(|key| Taint {
                                key: key.to_string(),
                                effect: "NoSchedule".to_string(),
                                value: None,
                                time_added: None,
                            })
                            .collect(),
                    )
                },
                ..Default::default()
            }),
            status: ip.map(|addr| NodeStatus {
                addresses: Some(vec![NodeAddress {
                    type_: "ExternalIP".to_string(),
                    address: addr.to_string(),
                }]),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn projects_external_ip_and_taints() {
        let node = k8s_node("n1", Some("10.0.0.1"), vec!["DeletionCandidateOfClusterAutoscaler"]);
        let projected = project_node(&node);
        assert_eq!(projected.name, "n1");
        assert_eq!(projected.external_ipv4, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(projected.is_eligible());
    }

    #[test]
    fn node_without_status_has_no_ip() {
        let node = k8s_node("n1", None, vec![]);
        let projected = project_node(&node);
        assert_eq!(projected.external_ipv4, None);
        assert!(!projected.is_eligible());
    }

    #[test]
    fn projects_service_with_dns_annotations() {
        let mut annotations = BTreeMap::new();
        annotations.insert("epictetus.io/dns-enabled".to_string(), "true".to_string());
        annotations.insert("epictetus.io/hostname".to_string(), "api.example.com".to_string());
        let service = K8sService {
            metadata: ObjectMeta {
                name: Some("svc".to_string()),
                namespace: Some("ns".to_string()),
                annotations: Some(annotations),
                ..Default::default()
            },
            spec: None,
            status: None,
        };
        let spec = project_service(&service).expect("spec should be produced");
        assert_eq!(spec.hostname, "api.example.com");
        assert_eq!(spec.owner, "ns/svc");
    }

    #[test]
    fn service_without_dns_enabled_projects_nothing() {
        let service = K8sService {
            metadata: ObjectMeta {
                name: Some("svc".to_string()),
                namespace: Some("ns".to_string()),
                ..Default::default()
            },
            spec: None,
            status: None,
        };
        assert!(project_service(&service).is_none());
    }
}
