//! Capability traits: the seams along which this crate is tested and extended.
//!
//! Each trait is a small, focused interface standing in for a collaborator the engine does
//! not own: the DNS provider's HTTP API, the zone directory on top of it, and the cluster's
//! live node/service state. Production implementations live in sibling crates
//! (`rrdns-provider-cloudflare`, `rrdns-observer-kube`); tests implement these traits
//! directly with in-memory fakes.

pub mod cluster_observer;
pub mod dns_provider;
pub mod zone_resolver;

pub use cluster_observer::{ClusterObserver, ClusterSnapshot};
pub use dns_provider::DnsProvider;
pub use zone_resolver::ZoneResolver;
