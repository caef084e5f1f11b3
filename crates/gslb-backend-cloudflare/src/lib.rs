//! # Cloudflare DNS backend
//!
//! [`DnsBackend`] implementation over the Cloudflare v4 REST API. One backend
//! instance is bound to one zone and carries the TTL and `proxied` flag used
//! on every record mutation; the supervisor builds one instance per origin.
//!
//! The backend performs single-shot API calls only. Retry, scheduling and
//! the create-before-delete replacement ordering are owned by `gslb-core`.
//!
//! ## API reference
//!
//! - List records: GET `/zones/:zone_id/dns_records?name=...&type=...`
//! - Create record: POST `/zones/:zone_id/dns_records`
//! - Update record: PUT `/zones/:zone_id/dns_records/:record_id`
//! - Delete record: DELETE `/zones/:zone_id/dns_records/:record_id`
//!
//! ## Security
//!
//! The API token never appears in logs; the `Debug` implementation redacts it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gslb_core::config::RecordType;
use gslb_core::registry::ComponentRegistry;
use gslb_core::traits::{BackendParams, DnsBackend, DnsBackendFactory, DnsRecord};
use gslb_core::{Error, Result};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare DNS backend bound to one zone
pub struct CloudflareBackend {
    api_token: String,
    zone_id: String,
    proxied: bool,
    ttl: u32,
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for CloudflareBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareBackend")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("proxied", &self.proxied)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CloudflareBackend {
    /// Create a backend for one zone.
    ///
    /// Fails on an empty API token or zone ID and on HTTP client
    /// construction errors.
    pub fn new(
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
        proxied: bool,
        ttl: u32,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        let zone_id = zone_id.into();
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone ID cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|err| Error::backend(format!("failed to build HTTP client: {}", err)))?;

        Ok(Self {
            api_token,
            zone_id,
            proxied,
            ttl,
            client,
            base_url: CLOUDFLARE_API_BASE.to_string(),
        })
    }

    /// Override the API base URL (local API gateways, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    fn record_url(&self, record_id: &str) -> String {
        format!("{}/{}", self.records_url(), record_id)
    }

    fn record_body<'a>(
        &self,
        name: &'a str,
        record_type: RecordType,
        content: &'a str,
    ) -> RecordBody<'a> {
        RecordBody {
            record_type: record_type.as_str(),
            name,
            content,
            ttl: self.ttl,
            proxied: self.proxied,
        }
    }
}

#[async_trait]
impl DnsBackend for CloudflareBackend {
    async fn list_records(&self, name: &str, record_type: RecordType) -> Result<Vec<DnsRecord>> {
        let response = self
            .client
            .get(self.records_url())
            .bearer_auth(&self.api_token)
            .query(&[("name", name), ("type", record_type.as_str())])
            .send()
            .await
            .map_err(|err| Error::backend(format!("HTTP request failed: {}", err)))?;

        if !response.status().is_success() {
            return Err(error_for_status("record list failed", response).await);
        }

        let envelope: ApiEnvelope<Vec<RecordResponse>> = response
            .json()
            .await
            .map_err(|err| Error::backend(format!("failed to parse response: {}", err)))?;

        check_envelope(envelope, "record list failed")?
            .into_iter()
            .map(RecordResponse::into_record)
            .collect()
    }

    async fn create_record(
        &self,
        name: &str,
        record_type: RecordType,
        content: &str,
    ) -> Result<DnsRecord> {
        tracing::debug!(
            "Creating DNS record {} ({}) -> {}",
            name,
            record_type,
            content
        );

        let response = self
            .client
            .post(self.records_url())
            .bearer_auth(&self.api_token)
            .json(&self.record_body(name, record_type, content))
            .send()
            .await
            .map_err(|err| Error::backend(format!("HTTP request failed: {}", err)))?;

        if !response.status().is_success() {
            return Err(error_for_status("record create failed", response).await);
        }

        let envelope: ApiEnvelope<RecordResponse> = response
            .json()
            .await
            .map_err(|err| Error::backend(format!("failed to parse response: {}", err)))?;

        check_envelope(envelope, "record create failed")?.into_record()
    }

    async fn update_record(
        &self,
        record_id: &str,
        name: &str,
        record_type: RecordType,
        content: &str,
    ) -> Result<DnsRecord> {
        tracing::debug!(
            "Updating DNS record {} ({}) -> {}",
            name,
            record_type,
            content
        );

        let response = self
            .client
            .put(self.record_url(record_id))
            .bearer_auth(&self.api_token)
            .json(&self.record_body(name, record_type, content))
            .send()
            .await
            .map_err(|err| Error::backend(format!("HTTP request failed: {}", err)))?;

        if !response.status().is_success() {
            return Err(error_for_status("record update failed", response).await);
        }

        let envelope: ApiEnvelope<RecordResponse> = response
            .json()
            .await
            .map_err(|err| Error::backend(format!("failed to parse response: {}", err)))?;

        check_envelope(envelope, "record update failed")?.into_record()
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        tracing::debug!("Deleting DNS record {}", record_id);

        let response = self
            .client
            .delete(self.record_url(record_id))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|err| Error::backend(format!("HTTP request failed: {}", err)))?;

        if !response.status().is_success() {
            return Err(error_for_status("record delete failed", response).await);
        }

        Ok(())
    }

    fn zone_id(&self) -> &str {
        &self.zone_id
    }
}

/// Record mutation body; every mutation carries the zone TTL and proxy flag
#[derive(Debug, Serialize)]
struct RecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

/// Standard Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

/// One DNS record as returned by the API
#[derive(Debug, Deserialize)]
struct RecordResponse {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
}

impl RecordResponse {
    fn into_record(self) -> Result<DnsRecord> {
        let record_type: RecordType = self
            .record_type
            .parse()
            .map_err(|_| Error::backend(format!("unexpected record type in response: {}", self.record_type)))?;

        Ok(DnsRecord {
            id: self.id,
            name: self.name,
            record_type,
            content: self.content,
        })
    }
}

fn check_envelope<T>(envelope: ApiEnvelope<T>, context: &str) -> Result<T> {
    if !envelope.success {
        let messages: Vec<String> = envelope
            .errors
            .iter()
            .map(|err| format!("{} (code {})", err.message, err.code))
            .collect();
        return Err(Error::backend(format!("{}: {}", context, messages.join("; "))));
    }

    envelope
        .result
        .ok_or_else(|| Error::backend(format!("{}: response missing result", context)))
}

async fn error_for_status(context: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error response".to_string());

    match status.as_u16() {
        401 | 403 => Error::backend(format!(
            "{}: authentication failed, invalid API token or insufficient permissions (status {})",
            context, status
        )),
        404 => Error::backend(format!("{}: not found (status {})", context, status)),
        429 => Error::backend(format!(
            "{}: rate limit exceeded, retry later (status {})",
            context, status
        )),
        500..=599 => Error::backend(format!(
            "{}: Cloudflare server error (status {}): {}",
            context, status, body
        )),
        _ => Error::backend(format!("{}: unexpected status {}: {}", context, status, body)),
    }
}

/// Factory for creating Cloudflare backends
pub struct CloudflareBackendFactory;

impl DnsBackendFactory for CloudflareBackendFactory {
    fn create(&self, params: &BackendParams) -> Result<Arc<dyn DnsBackend>> {
        Ok(Arc::new(CloudflareBackend::new(
            params.api_token.clone(),
            params.zone_id.clone(),
            params.proxied,
            params.ttl,
        )?))
    }
}

/// Register the Cloudflare backend with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_backend("cloudflare", Box::new(CloudflareBackendFactory));
}
