//! Core reconciliation logic for rrdns: maintains DNS A records for a set of hostnames in
//! step with which cluster nodes are currently eligible to serve traffic.
//!
//! - [`traits`]: the capability interfaces (`ZoneResolver`, `DnsProvider`, `ClusterObserver`)
//!   production implementations fulfil and tests fake.
//! - [`model`]: the domain types (`Node`, `HostnameSpec`, `Zone`, `DesiredRecord`,
//!   `ActualRecord`) and node eligibility.
//! - [`annotations`]: parsing of `epictetus.io/*` service annotations into `HostnameSpec`.
//! - [`registry`]: merges per-service specs into one conflict-free set per hostname.
//! - [`builder`]: the pure desired-state function.
//! - [`diff`]: the per-zone desired-vs-actual diff algorithm.
//! - [`engine`]: the [`ReconciliationEngine`] that ties the above into a running pass loop.
//! - [`status`]: the shared status object the health server reads.
//! - [`config`]: environment-driven daemon configuration.
//! - [`error`]: the crate's error taxonomy.

pub mod annotations;
pub mod builder;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod model;
pub mod registry;
pub mod status;
pub mod traits;
pub mod zone_match;

pub use config::Config;
pub use engine::{EngineConfig, EngineEvent, ReconciliationEngine};
pub use error::{Error, Result};
pub use status::{PassOutcome, SharedStatus, Status};
