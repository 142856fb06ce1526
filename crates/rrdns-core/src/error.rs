//! Error types for the reconciliation controller.
//!
//! This module defines the taxonomy the rest of the crate reports through. The
//! reconciliation loop itself never propagates these upward: per-operation failures are
//! folded into a pass outcome (see [`crate::engine`]), so most of these variants surface
//! only through logs and the status endpoint, not as a returned `Err` from a running engine.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation controller.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration is malformed or a required value is missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// A service annotation could not be parsed into a valid `HostnameSpec` field.
    #[error("annotation parse error on {field}: {reason}")]
    AnnotationParse {
        /// Annotation field name (e.g. `hostname`, `ttl`).
        field: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A hostname matched no known DNS zone.
    #[error("no zone matches hostname: {0}")]
    NoMatchingZone(String),

    /// The DNS provider returned a transient failure (5xx, 429, transport) after exhausting
    /// retries.
    #[error("DNS provider transient error: {0}")]
    ProviderTransient(String),

    /// The DNS provider returned a non-retryable failure (4xx other than 429, auth).
    #[error("DNS provider permanent error: {0}")]
    ProviderPermanent(String),

    /// The cluster watch stream disconnected; the observer will relist-and-rewatch.
    #[error("cluster watch disconnected: {0}")]
    WatchDisconnected(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Credential missing at startup. Always fatal.
    #[error("required credential missing: {0}")]
    CredentialAbsent(String),

    /// Generic error with context, used for conditions with no dedicated variant.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`Error::AnnotationParse`].
    pub fn annotation_parse(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AnnotationParse {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`Error::NoMatchingZone`].
    pub fn no_matching_zone(hostname: impl Into<String>) -> Self {
        Self::NoMatchingZone(hostname.into())
    }

    /// Build a [`Error::ProviderTransient`].
    pub fn provider_transient(msg: impl Into<String>) -> Self {
        Self::ProviderTransient(msg.into())
    }

    /// Build a [`Error::ProviderPermanent`].
    pub fn provider_permanent(msg: impl Into<String>) -> Self {
        Self::ProviderPermanent(msg.into())
    }

    /// Build a [`Error::WatchDisconnected`].
    pub fn watch_disconnected(msg: impl Into<String>) -> Self {
        Self::WatchDisconnected(msg.into())
    }

    /// Build a [`Error::CredentialAbsent`].
    pub fn credential_absent(msg: impl Into<String>) -> Self {
        Self::CredentialAbsent(msg.into())
    }

    /// True if this error represents a condition the DNS provider client should retry.
    ///
    /// Centralizing this here keeps the classifier a single decision point rather than
    /// scattering status-code judgment calls across call sites (§4.2/§9: the provider layer
    /// owns retry policy for this design, not the engine).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ProviderTransient(_) | Error::WatchDisconnected(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
